//! Scripted in-memory renderer for tests.

use super::Renderer;
use crate::{error::*, selectors::Sel};
use scraper::Html;
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

#[derive(Default)]
pub(crate) struct ScriptedRenderer {
    /// Successive snapshots per URL, advanced by `reload`; the last one sticks.
    pages: HashMap<String, VecDeque<String>>,
    /// Markup that replaces the page after any non-link click on that URL.
    click_swaps: HashMap<String, String>,
    failing: HashSet<String>,
    failing_clicks: bool,
    current: Option<String>,
    visits: Vec<String>,
    clicks: Vec<Sel>,
    scrolls: usize,
    reloads: usize,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), VecDeque::from(vec![html.to_string()]));
        self
    }

    pub fn page_sequence(mut self, url: &str, htmls: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            htmls.iter().map(|h| h.to_string()).collect(),
        );
        self
    }

    pub fn click_swaps(mut self, url: &str, html: &str) -> Self {
        self.click_swaps.insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn failing_clicks(mut self) -> Self {
        self.failing_clicks = true;
        self
    }

    pub fn visits(&self) -> &[String] {
        &self.visits
    }

    pub fn clicks(&self) -> &[Sel] {
        &self.clicks
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    pub fn reloads(&self) -> usize {
        self.reloads
    }

    fn peek(&self) -> Result<&String> {
        let url = self.current.as_ref().ok_or(HarvestError::NoPage)?;
        self.pages
            .get(url)
            .and_then(|q| q.front())
            .ok_or(HarvestError::NoPage)
    }

    fn resolve(&self, href: &str) -> String {
        match self.current.as_deref().and_then(|c| Url::parse(c).ok()) {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

impl Renderer for ScriptedRenderer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn goto(&mut self, url: &str) -> Result<()> {
        let url = self.resolve(url);
        self.visits.push(url.clone());
        if self.failing.contains(&url) {
            return Err(HarvestError::navigation(url, "timeout"));
        }
        if !self.pages.contains_key(&url) {
            return Err(HarvestError::navigation(url, "status 404"));
        }
        self.current = Some(url);
        Ok(())
    }

    fn content(&mut self) -> Result<String> {
        self.peek().cloned()
    }

    fn scroll(&mut self, _fraction: f64) -> Result<()> {
        self.scrolls += 1;
        Ok(())
    }

    fn click(&mut self, target: &Sel) -> Result<()> {
        if self.failing_clicks {
            return Err(HarvestError::ElementNotFound(target.to_string()));
        }
        let html = self.peek()?.clone();
        let doc = Html::parse_document(&html);
        let el = target
            .first_in_doc(&doc)
            .ok_or_else(|| HarvestError::ElementNotFound(target.to_string()))?;
        let href = el.value().attr("href").map(str::to_string);
        self.clicks.push(target.clone());

        match href {
            Some(h) => self.goto(&h),
            None => {
                let url = self.current.clone().ok_or(HarvestError::NoPage)?;
                if let Some(swap) = self.click_swaps.get(&url).cloned() {
                    self.pages.insert(url, VecDeque::from(vec![swap]));
                }
                Ok(())
            }
        }
    }

    fn current_url(&self) -> Option<String> {
        self.current.clone()
    }

    fn reload(&mut self) -> Result<()> {
        let url = self.current.clone().ok_or(HarvestError::NoPage)?;
        let queue = self.pages.get_mut(&url).ok_or(HarvestError::NoPage)?;
        if queue.len() > 1 {
            queue.pop_front();
        }
        self.reloads += 1;
        Ok(())
    }
}
