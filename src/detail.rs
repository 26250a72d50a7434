//! Sequential detail-page visits that fill in listing descriptions.

use crate::challenge::{clear_challenge, ChallengeDetector};
use crate::error::Result;
use crate::extract::extract_long_text;
use crate::pacing::Pacer;
use crate::policy::HarvestPolicy;
use crate::render::{activate_first, snapshot, Activation, Renderer};
use crate::types::{Description, Listing};
use tracing::{debug, info, warn};

/// Tally of description outcomes for one fetch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailStats {
    pub described: usize,
    pub absent: usize,
    pub blocked: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl DetailStats {
    fn record(&mut self, d: &Description) {
        match d {
            Description::Text(_) => self.described += 1,
            Description::Absent => self.absent += 1,
            Description::CaptchaBlocked => self.blocked += 1,
            Description::Error => self.errored += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.described + self.absent + self.blocked + self.errored
    }
}

pub struct DetailFetcher<'a, R: Renderer + ?Sized> {
    renderer: &'a mut R,
    policy: &'a HarvestPolicy,
    detector: &'a ChallengeDetector,
    pacer: &'a Pacer,
    min_chars: usize,
    progress_every: usize,
}

impl<'a, R: Renderer + ?Sized> DetailFetcher<'a, R> {
    pub fn new(
        renderer: &'a mut R,
        policy: &'a HarvestPolicy,
        detector: &'a ChallengeDetector,
        pacer: &'a Pacer,
        min_chars: usize,
    ) -> Self {
        Self {
            renderer,
            policy,
            detector,
            pacer,
            min_chars,
            progress_every: 10,
        }
    }

    pub fn progress_every(mut self, n: usize) -> Self {
        self.progress_every = n.max(1);
        self
    }

    /// Visit each listing's page in order. Output order equals input order.
    pub fn fetch_details(&mut self, listings: Vec<Listing>) -> (Vec<Listing>, DetailStats) {
        let total = listings.len();
        let mut stats = DetailStats::default();
        let mut out = Vec::with_capacity(total);

        for (idx, mut listing) in listings.into_iter().enumerate() {
            let Some(url) = listing.url().map(str::to_string) else {
                debug!("no detail url for {}", listing.address);
                stats.skipped += 1;
                out.push(listing);
                continue;
            };

            let description = self.describe(&url);
            if !description.is_text() {
                info!("description for {}: {description}", listing.address);
            }
            stats.record(&description);
            listing.description = description;
            out.push(listing);

            let done = idx + 1;
            if done % self.progress_every == 0 {
                info!("detail progress: {done}/{total}");
            }
        }

        info!(
            "descriptions collected for {}/{} listings ({} blocked, {} errors)",
            stats.described,
            stats.attempted(),
            stats.blocked,
            stats.errored
        );
        (out, stats)
    }

    fn describe(&mut self, url: &str) -> Description {
        match self.try_describe(url) {
            Ok(d) => d,
            Err(e) => {
                warn!("detail page {url} failed: {e}");
                Description::Error
            }
        }
    }

    fn try_describe(&mut self, url: &str) -> Result<Description> {
        let pacing = self.pacer.pacing();
        self.pacer.pause(pacing.before_detail);
        self.renderer.goto(url)?;

        if !clear_challenge(&mut *self.renderer, self.detector, self.pacer) {
            return Ok(Description::CaptchaBlocked);
        }
        self.pacer.pause(pacing.after_detail_load);

        self.expand_description();

        let doc = snapshot(&mut *self.renderer)?;
        Ok(
            match extract_long_text(doc.root_element(), &self.policy.description, self.min_chars) {
                Some(text) => Description::Text(text),
                None => Description::Absent,
            },
        )
    }

    fn expand_description(&mut self) {
        let pacing = self.pacer.pacing();
        self.pacer.pause(pacing.before_show_more);
        if let Activation::Activated(sel) = activate_first(&mut *self.renderer, &self.policy.show_more) {
            debug!("expanded description with {sel}");
            self.pacer.pause(pacing.after_show_more);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::Pacing;
    use crate::policy::ChallengeProbes;
    use crate::render::mock::ScriptedRenderer;

    const LONG: &str = "Spacious two-bedroom apartment with in-unit laundry, hardwood floors and views of the reservoir.";

    fn page(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    fn run(r: &mut ScriptedRenderer, listings: Vec<Listing>) -> (Vec<Listing>, DetailStats) {
        let policy = HarvestPolicy::default();
        let detector = ChallengeDetector::new(ChallengeProbes::default());
        let pacer = Pacer::new(Pacing::none());
        DetailFetcher::new(r, &policy, &detector, &pacer, 50).fetch_details(listings)
    }

    #[test]
    fn assigns_each_outcome_in_order() {
        let mut r = ScriptedRenderer::new()
            .page("https://x.test/a", &page(&format!(r#"<div class="description">{LONG}</div>"#)))
            .page("https://x.test/b", &page("<p>Tiny.</p>"))
            .page("https://x.test/c", &page(r#"<div id="px-captcha-wrapper"></div>"#))
            .failing("https://x.test/d");
        let input = vec![
            Listing::summary("A").with_url("https://x.test/a"),
            Listing::summary("B").with_url("https://x.test/b"),
            Listing::summary("C").with_url("https://x.test/c"),
            Listing::summary("D").with_url("https://x.test/d"),
        ];
        let (out, stats) = run(&mut r, input);

        let addrs: Vec<_> = out.iter().map(|l| l.address.as_str()).collect();
        assert_eq!(addrs, vec!["A", "B", "C", "D"]);
        assert_eq!(out[0].description, Description::Text(LONG.into()));
        assert_eq!(out[1].description, Description::Absent);
        assert_eq!(out[2].description, Description::CaptchaBlocked);
        assert_eq!(out[3].description, Description::Error);
        assert_eq!(stats.attempted(), 4);
        assert_eq!(stats.described, 1);
    }

    #[test]
    fn listing_without_url_passes_through() {
        let mut r = ScriptedRenderer::new();
        let (out, stats) = run(&mut r, vec![Listing::summary("No link")]);
        assert_eq!(out, vec![Listing::summary("No link")]);
        assert_eq!(stats.skipped, 1);
        assert!(r.visits().is_empty());
    }

    #[test]
    fn show_more_expands_before_extraction() {
        let collapsed = page(r#"<div class="description">Short teaser.</div><button>Show more</button>"#);
        let expanded = page(&format!(r#"<div class="description">{LONG}</div>"#));
        let mut r = ScriptedRenderer::new()
            .page("https://x.test/a", &collapsed)
            .click_swaps("https://x.test/a", &expanded);
        let (out, _) = run(&mut r, vec![Listing::summary("A").with_url("https://x.test/a")]);
        assert_eq!(out[0].description.text(), Some(LONG));
        assert_eq!(r.clicks().len(), 1);
    }

    #[test]
    fn failed_expander_is_harmless() {
        let html = page(&format!(r#"<p>{LONG}</p><button>Read more</button>"#));
        let mut r = ScriptedRenderer::new().page("https://x.test/a", &html).failing_clicks();
        let (out, _) = run(&mut r, vec![Listing::summary("A").with_url("https://x.test/a")]);
        assert!(out[0].description.is_text());
    }

    #[test]
    fn other_fields_are_untouched() {
        let mut r = ScriptedRenderer::new().page("https://x.test/a", &page(&format!("<p>{LONG}</p>")));
        let mut l = Listing::summary("A").with_url("https://x.test/a");
        l.price = "$2,000/mo".into();
        l.page_number = Some(4);
        let (out, _) = run(&mut r, vec![l]);
        assert_eq!(out[0].price, "$2,000/mo");
        assert_eq!(out[0].page_number, Some(4));
    }
}
