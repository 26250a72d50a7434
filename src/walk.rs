//! Pagination walker over a region's listing index.

use crate::challenge::{clear_challenge, ChallengeDetector};
use crate::extract::{extract_link, extract_text, first_text};
use crate::pacing::Pacer;
use crate::policy::HarvestPolicy;
use crate::render::{activate_first, snapshot, Activation, Renderer};
use crate::selectors::Sel;
use crate::types::Listing;
use scraper::{ElementRef, Html};
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

/// Why a walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    PageCeiling,
    PaginationExhausted,
    ChallengeUnresolved,
    NavigationFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => f.write_str("target reached"),
            StopReason::PageCeiling => f.write_str("page ceiling reached"),
            StopReason::PaginationExhausted => f.write_str("no further pages"),
            StopReason::ChallengeUnresolved => f.write_str("challenge not resolved"),
            StopReason::NavigationFailed(e) => write!(f, "navigation failed: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub listings: Vec<Listing>,
    pub pages_visited: u32,
    pub stop: StopReason,
}

enum NextPage {
    Advanced,
    Missing,
    Disabled,
    Failed(String),
}

pub struct Walker<'a, R: Renderer + ?Sized> {
    renderer: &'a mut R,
    policy: &'a HarvestPolicy,
    detector: &'a ChallengeDetector,
    pacer: &'a Pacer,
    base: Url,
}

impl<'a, R: Renderer + ?Sized> Walker<'a, R> {
    pub fn new(
        renderer: &'a mut R,
        policy: &'a HarvestPolicy,
        detector: &'a ChallengeDetector,
        pacer: &'a Pacer,
        base: Url,
    ) -> Self {
        Self {
            renderer,
            policy,
            detector,
            pacer,
            base,
        }
    }

    /// Collect up to `target_count` listing summaries from at most `max_pages` index pages.
    ///
    /// Never fails: every early stop returns what was collected so far.
    pub fn walk(&mut self, index_url: &str, target_count: usize, max_pages: u32) -> WalkOutcome {
        info!("walking {index_url} for {target_count} listings (max {max_pages} pages)");
        let mut listings: Vec<Listing> = Vec::new();
        let mut page: u32 = 1;
        let mut visited: u32 = 0;

        if let Err(e) = self.renderer.goto(index_url) {
            warn!("could not open index page: {e}");
            return WalkOutcome {
                listings,
                pages_visited: 0,
                stop: StopReason::NavigationFailed(e.to_string()),
            };
        }
        self.pacer.pause(self.pacer.pacing().index_settle);

        let stop = loop {
            if listings.len() >= target_count {
                break StopReason::TargetReached;
            }
            if page > max_pages {
                break StopReason::PageCeiling;
            }

            info!(page, collected = listings.len(), "processing index page");
            self.trigger_lazy_loading();

            if !clear_challenge(&mut *self.renderer, self.detector, self.pacer) {
                break StopReason::ChallengeUnresolved;
            }

            let doc = match snapshot(&mut *self.renderer) {
                Ok(doc) => doc,
                Err(e) => break StopReason::NavigationFailed(e.to_string()),
            };
            visited = page;
            self.log_result_count(&doc);

            let remaining = target_count - listings.len();
            let mut found = self.extract_cards(&doc, remaining);
            if found.is_empty() {
                warn!(page, "no listings extracted from this page");
            } else {
                info!(page, found = found.len(), "listings extracted");
            }
            for listing in &mut found {
                listing.page_number = Some(page);
            }
            listings.append(&mut found);

            if listings.len() >= target_count {
                break StopReason::TargetReached;
            }
            if page >= max_pages {
                break StopReason::PageCeiling;
            }

            match self.next_page(&doc) {
                NextPage::Advanced => {
                    page += 1;
                    self.pacer.pause(self.pacer.pacing().between_pages);
                }
                NextPage::Missing | NextPage::Disabled => break StopReason::PaginationExhausted,
                NextPage::Failed(e) => break StopReason::NavigationFailed(e),
            }
        };

        info!(
            collected = listings.len(),
            pages = visited,
            "walk finished: {stop}"
        );
        WalkOutcome {
            listings,
            pages_visited: visited,
            stop,
        }
    }

    fn trigger_lazy_loading(&mut self) {
        let pacing = self.pacer.pacing();
        for _ in 0..pacing.scroll_steps {
            if let Err(e) = self.renderer.scroll(pacing.scroll_target()) {
                debug!("scroll failed: {e}");
            }
            self.pacer.pause(pacing.scroll_interval);
        }
        self.pacer.pause(pacing.post_scroll_settle);

        if let Activation::Activated(sel) =
            activate_first(&mut *self.renderer, &self.policy.load_more)
        {
            info!("activated load-more control {sel}");
            self.pacer.pause(pacing.after_load_more);
        }
    }

    fn log_result_count(&self, doc: &Html) {
        if let Some(text) = first_text(doc.root_element(), &self.policy.result_count) {
            info!("index reports: {text}");
        }
    }

    /// Cards from the first container strategy with at least one match.
    fn locate_cards<'d>(&self, doc: &'d Html) -> Vec<ElementRef<'d>> {
        for sel in &self.policy.cards {
            let cards = sel.select_doc(doc);
            if !cards.is_empty() {
                debug!("found {} cards with {sel}", cards.len());
                return cards;
            }
        }
        Vec::new()
    }

    fn extract_cards(&self, doc: &Html, limit: usize) -> Vec<Listing> {
        let cards = self.locate_cards(doc);
        if cards.is_empty() {
            warn!("no listing cards matched any card strategy");
            return Vec::new();
        }

        let mut out = Vec::new();
        for (idx, card) in cards.into_iter().enumerate() {
            if out.len() >= limit {
                break;
            }
            match self.card_to_listing(card) {
                Some(listing) => out.push(listing),
                None => warn!(card = idx + 1, "discarding card: no address"),
            }
        }
        out
    }

    fn card_to_listing(&self, card: ElementRef<'_>) -> Option<Listing> {
        let f = &self.policy.fields;
        let address = first_text(card, &f.address)?;
        let mut listing = Listing::summary(address);
        listing.price = extract_text(card, &f.price);
        listing.beds = extract_text(card, &f.beds);
        listing.baths = extract_text(card, &f.baths);
        listing.sqft = extract_text(card, &f.sqft);
        listing.url = extract_link(card, &f.link, &self.base);
        Some(listing)
    }

    fn next_page(&mut self, doc: &Html) -> NextPage {
        let Some((sel, disabled)) = find_next_control(doc, &self.policy.next_page) else {
            info!("no next-page control found");
            return NextPage::Missing;
        };
        if disabled {
            info!("next-page control is disabled");
            return NextPage::Disabled;
        }

        debug!("advancing with {sel}");
        match self.renderer.click(&sel) {
            Ok(()) => {
                self.pacer.pause(self.pacer.pacing().after_next_click);
                NextPage::Advanced
            }
            Err(e) => {
                warn!("next-page control could not be activated: {e}");
                NextPage::Failed(e.to_string())
            }
        }
    }
}

/// First next-page control by priority, with its disabled state.
fn find_next_control(doc: &Html, strategies: &[Sel]) -> Option<(Sel, bool)> {
    strategies.iter().find_map(|sel| {
        let el = sel.first_in_doc(doc)?;
        let v = el.value();
        let disabled = v.attr("aria-disabled").map(|a| a.trim() == "true").unwrap_or(false)
            || v.attr("disabled").is_some();
        Some((sel.clone(), disabled))
    })
}
