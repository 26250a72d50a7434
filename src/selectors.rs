//! Lookup Strategies

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One lookup strategy: a CSS selector, optionally narrowed to elements whose
/// text contains `has_text` (case-insensitive).
///
/// Pure data. An unparseable selector simply never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sel {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,
}

impl Sel {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            has_text: None,
        }
    }

    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            has_text: Some(text.into()),
        }
    }

    fn compile(&self) -> Option<Selector> {
        Selector::parse(&self.css).ok()
    }

    fn accepts(&self, el: &ElementRef<'_>) -> bool {
        match &self.has_text {
            None => true,
            Some(needle) => element_text(el)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }

    /// All matches below `root`, in document order.
    pub fn select_in<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self.compile() {
            Some(sel) => root.select(&sel).filter(|el| self.accepts(el)).collect(),
            None => Vec::new(),
        }
    }

    /// All matches in a whole document, in document order.
    pub fn select_doc<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        match self.compile() {
            Some(sel) => doc.select(&sel).filter(|el| self.accepts(el)).collect(),
            None => Vec::new(),
        }
    }

    pub fn first_in_doc<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        self.select_doc(doc).into_iter().next()
    }
}

impl fmt::Display for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.has_text {
            Some(t) => write!(f, "{}:has-text(\"{}\")", self.css, t),
            None => f.write_str(&self.css),
        }
    }
}

/// Build a strategy list from plain CSS selectors.
pub fn sels(items: &[&str]) -> Vec<Sel> {
    items.iter().map(|s| Sel::css(*s)).collect()
}

/// Concatenated, whitespace-normalized text of an element.
pub fn element_text(el: &ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_strategy_matches_in_order() {
        let doc = Html::parse_document(r#"<ul><li class="a">one</li><li class="a">two</li></ul>"#);
        let hits = Sel::css("li.a").select_doc(&doc);
        assert_eq!(hits.len(), 2);
        assert_eq!(element_text(&hits[0]), "one");
    }

    #[test]
    fn has_text_is_case_insensitive() {
        let doc = Html::parse_document(
            r#"<button>Cancel</button><button> Show MORE </button>"#,
        );
        let hit = Sel::with_text("button", "show more").first_in_doc(&doc);
        assert_eq!(hit.map(|e| element_text(&e)), Some("Show MORE".to_string()));
    }

    #[test]
    fn invalid_selector_never_matches() {
        let doc = Html::parse_document("<p>text</p>");
        assert!(Sel::css("p[[[").select_doc(&doc).is_empty());
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }

    #[test]
    fn display_shows_text_filter() {
        assert_eq!(
            Sel::with_text("button", "Next").to_string(),
            "button:has-text(\"Next\")"
        );
    }
}
