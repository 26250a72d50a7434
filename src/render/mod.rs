//! Page rendering seam.
//!
//! The harvester drives exactly one [`Renderer`] at a time. Everything it reads
//! comes from [`Renderer::content`] snapshots parsed with `scraper`; everything it
//! does (navigate, scroll, click) goes through the trait so a script-executing
//! engine can replace [`HttpRenderer`] without touching the pipeline.

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpRenderer;

use crate::{error::*, selectors::Sel};
use scraper::Html;
use tracing::debug;

pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Load `url` as the current page.
    fn goto(&mut self, url: &str) -> Result<()>;

    /// Markup of the current page as rendered right now.
    fn content(&mut self) -> Result<String>;

    /// Scroll to `fraction` (0..=1) of the page height.
    fn scroll(&mut self, fraction: f64) -> Result<()>;

    /// Activate the first element matching `target`.
    fn click(&mut self, target: &Sel) -> Result<()>;

    fn current_url(&self) -> Option<String>;

    /// Load the current page again so later snapshots see what changed since.
    fn reload(&mut self) -> Result<()> {
        let url = self.current_url().ok_or(HarvestError::NoPage)?;
        self.goto(&url)
    }

    /// A person can see this renderer's window and act on it.
    fn is_interactive(&self) -> bool {
        false
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn goto(&mut self, url: &str) -> Result<()> {
        (**self).goto(url)
    }
    fn content(&mut self) -> Result<String> {
        (**self).content()
    }
    fn scroll(&mut self, fraction: f64) -> Result<()> {
        (**self).scroll(fraction)
    }
    fn click(&mut self, target: &Sel) -> Result<()> {
        (**self).click(target)
    }
    fn current_url(&self) -> Option<String> {
        (**self).current_url()
    }
    fn reload(&mut self) -> Result<()> {
        (**self).reload()
    }
    fn is_interactive(&self) -> bool {
        (**self).is_interactive()
    }
}

/// Outcome of a best-effort UI action. A control that was found but failed to
/// activate is reported as `NotPresent`; callers never tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Activated(Sel),
    NotPresent,
}

impl Activation {
    pub fn activated(&self) -> bool {
        matches!(self, Activation::Activated(_))
    }
}

/// Parse the current page. Fails only when the renderer cannot produce markup.
pub fn snapshot<R: Renderer + ?Sized>(renderer: &mut R) -> Result<Html> {
    let html = renderer.content()?;
    Ok(Html::parse_document(&html))
}

/// Click the first control that any strategy locates, in priority order.
pub fn activate_first<R: Renderer + ?Sized>(renderer: &mut R, strategies: &[Sel]) -> Activation {
    let target = match snapshot(renderer) {
        Ok(doc) => strategies
            .iter()
            .find(|s| s.first_in_doc(&doc).is_some())
            .cloned(),
        Err(e) => {
            debug!("snapshot for optional control failed: {e}");
            None
        }
    };

    let Some(target) = target else {
        return Activation::NotPresent;
    };

    match renderer.click(&target) {
        Ok(()) => Activation::Activated(target),
        Err(e) => {
            debug!("optional control {target} not activated: {e}");
            Activation::NotPresent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedRenderer;
    use super::*;

    #[test]
    fn activates_first_present_control() {
        let mut r = ScriptedRenderer::new().page(
            "https://x.test/",
            r#"<button>Load more</button><a class="more" href="/p2">more</a>"#,
        );
        r.goto("https://x.test/").unwrap();
        let out = activate_first(
            &mut r,
            &[Sel::css(".missing"), Sel::with_text("button", "load more")],
        );
        assert_eq!(out, Activation::Activated(Sel::with_text("button", "load more")));
        assert_eq!(r.clicks(), &[Sel::with_text("button", "load more")]);
    }

    #[test]
    fn absent_control_is_not_present() {
        let mut r = ScriptedRenderer::new().page("https://x.test/", "<p>nothing</p>");
        r.goto("https://x.test/").unwrap();
        assert_eq!(activate_first(&mut r, &[Sel::css("button")]), Activation::NotPresent);
        assert!(r.clicks().is_empty());
    }

    #[test]
    fn failed_click_collapses_to_not_present() {
        let mut r = ScriptedRenderer::new()
            .page("https://x.test/", "<button>Show more</button>")
            .failing_clicks();
        r.goto("https://x.test/").unwrap();
        let out = activate_first(&mut r, &[Sel::with_text("button", "Show more")]);
        assert_eq!(out, Activation::NotPresent);
    }

    #[test]
    fn no_page_is_not_present() {
        let mut r = ScriptedRenderer::new();
        assert_eq!(activate_first(&mut r, &[Sel::css("a")]), Activation::NotPresent);
    }
}
