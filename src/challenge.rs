//! Bot-challenge detection and human-in-the-loop recovery.

use crate::pacing::{DelayRange, Pacer};
use crate::policy::ChallengeProbes;
use crate::render::Renderer;
use crate::selectors::Sel;
use scraper::Html;
use std::fmt;
use tracing::{debug, info, warn};

/// Which probe fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeSignal {
    Structural(Sel),
    Phrase(String),
}

impl fmt::Display for ChallengeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeSignal::Structural(sel) => write!(f, "element {sel}"),
            ChallengeSignal::Phrase(p) => write!(f, "phrase '{p}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    probes: ChallengeProbes,
}

impl ChallengeDetector {
    pub fn new(probes: ChallengeProbes) -> Self {
        let phrases = probes.phrases.iter().map(|p| p.to_lowercase()).collect();
        Self {
            probes: ChallengeProbes {
                structural: probes.structural,
                phrases,
            },
        }
    }

    /// Inspect the renderer's current page. A page that cannot be read counts as clear.
    pub fn detect<R: Renderer + ?Sized>(&self, renderer: &mut R) -> bool {
        match renderer.content() {
            Ok(html) => match self.inspect(&html) {
                Some(signal) => {
                    warn!("challenge detected: {signal}");
                    true
                }
                None => false,
            },
            Err(e) => {
                debug!("challenge probe could not read page: {e}");
                false
            }
        }
    }

    /// Structural probe first; the content probe only runs when it finds nothing.
    pub fn inspect(&self, html: &str) -> Option<ChallengeSignal> {
        self.structural_probe(html)
            .or_else(|| self.content_probe(html))
    }

    fn structural_probe(&self, html: &str) -> Option<ChallengeSignal> {
        let doc = Html::parse_document(html);
        self.probes
            .structural
            .iter()
            .find(|sel| sel.first_in_doc(&doc).is_some())
            .cloned()
            .map(ChallengeSignal::Structural)
    }

    fn content_probe(&self, html: &str) -> Option<ChallengeSignal> {
        let lower = html.to_lowercase();
        self.probes
            .phrases
            .iter()
            .find(|p| !p.is_empty() && lower.contains(p.as_str()))
            .cloned()
            .map(ChallengeSignal::Phrase)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Detected,
    Waiting,
    Resolved,
    StillBlocked,
}

/// Wait out a challenge, reload the page and look again.
///
/// Performs no interaction with the challenge. On an interactive renderer a
/// person may solve it during the wait. `false` means the current page or
/// listing must be abandoned for this run.
pub fn recover<R: Renderer + ?Sized>(
    renderer: &mut R,
    detector: &ChallengeDetector,
    pacer: &Pacer,
    wait: DelayRange,
) -> bool {
    let mut state = RecoveryState::Detected;
    let url = renderer.current_url().unwrap_or_else(|| "-".to_string());
    if renderer.is_interactive() {
        warn!(url = %url, "challenge in the way; solve it in the browser window, waiting {}s", wait.max_ms / 1000);
    } else {
        warn!(url = %url, "challenge in the way; re-checking the page after {}s", wait.max_ms / 1000);
    }

    while !matches!(state, RecoveryState::Resolved | RecoveryState::StillBlocked) {
        state = match state {
            RecoveryState::Detected => {
                pacer.pause(wait);
                RecoveryState::Waiting
            }
            RecoveryState::Waiting => {
                if let Err(e) = renderer.reload() {
                    debug!("reload after challenge wait failed: {e}");
                }
                if detector.detect(renderer) {
                    RecoveryState::StillBlocked
                } else {
                    RecoveryState::Resolved
                }
            }
            done => done,
        };
    }

    match state {
        RecoveryState::Resolved => {
            info!("challenge cleared");
            true
        }
        _ => {
            warn!("challenge still present after wait");
            false
        }
    }
}

/// Detect, and recover when needed. `true` when the page is usable.
pub fn clear_challenge<R: Renderer + ?Sized>(
    renderer: &mut R,
    detector: &ChallengeDetector,
    pacer: &Pacer,
) -> bool {
    if !detector.detect(renderer) {
        return true;
    }
    recover(renderer, detector, pacer, pacer.pacing().challenge_wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::Pacing;
    use crate::render::mock::ScriptedRenderer;

    const CLEAN: &str = "<html><body><h1>Rentals in Echo Park</h1><p>120 results</p></body></html>";
    const PX: &str = r#"<html><body><div id="px-captcha-wrapper"></div></body></html>"#;
    const PHRASE: &str = "<html><body><p>Press &amp; Hold to confirm you are a human (and not a bot).</p></body></html>";

    fn detector() -> ChallengeDetector {
        ChallengeDetector::new(ChallengeProbes::default())
    }

    #[test]
    fn clean_page_has_no_signal() {
        assert_eq!(detector().inspect(CLEAN), None);
    }

    #[test]
    fn structural_probe_wins_before_content() {
        let html = r#"<div id="px-captcha-wrapper"></div><p>recaptcha</p>"#;
        assert_eq!(
            detector().inspect(html),
            Some(ChallengeSignal::Structural(Sel::css("#px-captcha-wrapper")))
        );
        assert!(matches!(detector().inspect(PX), Some(ChallengeSignal::Structural(_))));
    }

    #[test]
    fn content_probe_is_case_insensitive() {
        let probes = ChallengeProbes {
            structural: vec![],
            phrases: vec!["Confirm You Are A Human".into()],
        };
        let d = ChallengeDetector::new(probes);
        assert_eq!(
            d.inspect(PHRASE),
            Some(ChallengeSignal::Phrase("confirm you are a human".into()))
        );
    }

    #[test]
    fn broken_probe_counts_as_negative() {
        let probes = ChallengeProbes {
            structural: vec![Sel::css("div[[[")],
            phrases: vec![String::new()],
        };
        assert_eq!(ChallengeDetector::new(probes).inspect(PX), None);
    }

    #[test]
    fn unreadable_page_is_not_a_challenge() {
        let mut r = ScriptedRenderer::new();
        assert!(!detector().detect(&mut r));
    }

    #[test]
    fn recovery_succeeds_when_human_clears_it() {
        let mut r = ScriptedRenderer::new().page_sequence("https://x.test/", &[PX, CLEAN]);
        r.goto("https://x.test/").unwrap();
        let pacer = Pacer::new(Pacing::none());
        assert!(detector().detect(&mut r));
        assert!(recover(&mut r, &detector(), &pacer, DelayRange::ZERO));
        assert_eq!(r.reloads(), 1);
    }

    #[test]
    fn recovery_looks_at_a_reloaded_page() {
        let mut r = ScriptedRenderer::new().page_sequence("https://x.test/", &[PX, CLEAN]);
        r.goto("https://x.test/").unwrap();
        // Reading the page repeatedly does not change it; only a reload does.
        assert!(detector().detect(&mut r));
        assert!(detector().detect(&mut r));
        let pacer = Pacer::new(Pacing::none());
        assert!(clear_challenge(&mut r, &detector(), &pacer));
        assert_eq!(r.reloads(), 1);
    }

    #[test]
    fn recovery_fails_when_still_blocked() {
        let mut r = ScriptedRenderer::new().page("https://x.test/", PX);
        r.goto("https://x.test/").unwrap();
        let pacer = Pacer::new(Pacing::none());
        assert!(!clear_challenge(&mut r, &detector(), &pacer));
        assert_eq!(r.reloads(), 1);
    }

    #[test]
    fn clean_page_clears_without_waiting() {
        let mut r = ScriptedRenderer::new().page("https://x.test/", CLEAN);
        r.goto("https://x.test/").unwrap();
        let pacer = Pacer::new(Pacing::default());
        assert!(clear_challenge(&mut r, &detector(), &pacer));
    }
}
