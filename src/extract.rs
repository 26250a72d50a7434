//! Field extraction over priority-ordered strategy lists.
//!
//! Markup on the source drifts between deployments, so every field is looked up
//! through a list of strategies, most specific first. The first strategy that
//! yields usable text wins; when none does the field degrades to `N/A`.
//! Nothing here returns an error.

use crate::selectors::{element_text, Sel};
use crate::types::NOT_AVAILABLE;
use scraper::ElementRef;
use url::Url;

/// Text of the first match of the first strategy whose first match is non-empty.
pub fn first_text(root: ElementRef<'_>, strategies: &[Sel]) -> Option<String> {
    strategies.iter().find_map(|s| {
        s.select_in(root)
            .first()
            .map(element_text)
            .filter(|t| !t.is_empty())
    })
}

/// Like [`first_text`] but falls back to `N/A`.
pub fn extract_text(root: ElementRef<'_>, strategies: &[Sel]) -> String {
    first_text(root, strategies).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// First text longer than `min_chars`, scanning every match of each strategy.
///
/// Used for descriptions, where short hits are placeholders or empty shells.
pub fn extract_long_text(root: ElementRef<'_>, strategies: &[Sel], min_chars: usize) -> Option<String> {
    strategies.iter().find_map(|s| {
        s.select_in(root)
            .iter()
            .map(element_text)
            .find(|t| t.chars().count() > min_chars)
    })
}

/// First non-empty `href`, made absolute against `base`.
pub fn extract_link(root: ElementRef<'_>, strategies: &[Sel], base: &Url) -> Option<String> {
    strategies.iter().find_map(|s| {
        let el = s.select_in(root).into_iter().next()?;
        let href = el.value().attr("href")?.trim();
        absolutize(href, base)
    })
}

/// Resolve a possibly relative or protocol-relative link.
pub fn absolutize(href: &str, base: &Url) -> Option<String> {
    let href = href.trim().trim_matches('"').trim_matches('\'').trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let url = if href.starts_with("//") {
        Url::parse(&format!("{}:{}", base.scheme(), href)).ok()?
    } else {
        Url::parse(href).ok().or_else(|| base.join(href).ok())?
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
