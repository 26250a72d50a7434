use super::Renderer;
use crate::{config::SiteConfig, error::*, selectors::Sel};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::Html;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REDIRECT_LIMIT: usize = 10;

struct LoadedPage {
    url: Url,
    html: String,
}

/// Renders a page as the markup the server returns.
///
/// Nothing executes scripts, so scrolling is a no-op and a click only works on
/// controls that carry an `href` (it follows the link).
pub struct HttpRenderer {
    client: Client,
    headers: HeaderMap,
    current: Option<LoadedPage>,
}

impl HttpRenderer {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(site.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
            .timeout(Duration::from_millis(site.navigation_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            headers: to_headermap(&site.default_headers)?,
            current: None,
        })
    }

    fn resolve(&self, href: &str) -> Result<Url> {
        let parsed = match &self.current {
            Some(page) => page.url.join(href),
            None => Url::parse(href),
        };
        parsed.map_err(|_| HarvestError::InvalidUrl(href.to_string()))
    }
}

impl Renderer for HttpRenderer {
    fn name(&self) -> &'static str {
        "http"
    }

    fn goto(&mut self, url: &str) -> Result<()> {
        let target = self.resolve(url)?;
        debug!("GET {target}");

        let resp = self
            .client
            .get(target.clone())
            .headers(self.headers.clone())
            .send()
            .map_err(|e| HarvestError::navigation(target.as_str(), e.to_string()))?;

        let status = resp.status();
        let final_url = resp.url().clone();
        let html = resp
            .text()
            .map_err(|e| HarvestError::navigation(target.as_str(), e.to_string()))?;

        // Challenge pages often arrive as 403/429; keep them so the detector can see them.
        if !status.is_success() && !is_challenge_status(status) {
            return Err(HarvestError::navigation(
                target.as_str(),
                format!("status {}", status.as_u16()),
            ));
        }

        self.current = Some(LoadedPage {
            url: final_url,
            html,
        });
        Ok(())
    }

    fn content(&mut self) -> Result<String> {
        self.current
            .as_ref()
            .map(|p| p.html.clone())
            .ok_or(HarvestError::NoPage)
    }

    fn scroll(&mut self, _fraction: f64) -> Result<()> {
        Ok(())
    }

    fn click(&mut self, target: &Sel) -> Result<()> {
        let page = self.current.as_ref().ok_or(HarvestError::NoPage)?;
        let doc = Html::parse_document(&page.html);
        let el = target
            .first_in_doc(&doc)
            .ok_or_else(|| HarvestError::ElementNotFound(target.to_string()))?;

        let href = el
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"))
            .map(str::to_string)
            .ok_or_else(|| HarvestError::Unsupported {
                renderer: "http",
                action: format!("activate {target} (no link target)"),
            })?;

        let next = self.resolve(&href)?;
        self.goto(next.as_str())
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().map(|p| p.url.to_string())
    }
}

fn is_challenge_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

fn to_headermap(headers: &std::collections::BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|_| HarvestError::Config(format!("invalid header name: {k}")))?;
        let value = HeaderValue::from_str(v)
            .map_err(|_| HarvestError::Config(format!("invalid header value for {k}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{clear_challenge, ChallengeDetector};
    use crate::pacing::{Pacer, Pacing};
    use crate::policy::ChallengeProbes;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    const BLOCKED: &str = r#"<html><body><div id="px-captcha-wrapper"></div></body></html>"#;
    const CLEAN: &str = "<html><body><h1>Rentals in Echo Park</h1></body></html>";

    /// Serve `bodies` in order, one connection each, then stop.
    fn serve(bodies: &[&str]) -> (String, Arc<AtomicUsize>, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/rentals/", listener.local_addr().unwrap());
        let served = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&served);
        let bodies: Vec<String> = bodies.iter().map(|b| b.to_string()).collect();
        let handle = thread::spawn(move || {
            for body in bodies {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (url, served, handle)
    }

    #[test]
    fn reload_fetches_the_current_page_again() {
        let (url, served, server) = serve(&[BLOCKED, CLEAN]);
        let mut r = HttpRenderer::new(&SiteConfig::default()).unwrap();
        r.goto(&url).unwrap();
        assert_eq!(r.content().unwrap(), BLOCKED);

        r.reload().unwrap();
        assert_eq!(r.content().unwrap(), CLEAN);
        assert_eq!(r.current_url().as_deref(), Some(url.as_str()));
        server.join().unwrap();
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn challenge_that_clears_on_reload_is_recovered() {
        let (url, served, server) = serve(&[BLOCKED, CLEAN]);
        let mut r = HttpRenderer::new(&SiteConfig::default()).unwrap();
        r.goto(&url).unwrap();

        let detector = ChallengeDetector::new(ChallengeProbes::default());
        let pacer = Pacer::new(Pacing::none());
        assert!(!r.is_interactive());
        assert!(clear_challenge(&mut r, &detector, &pacer));
        server.join().unwrap();
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reload_without_page_is_an_error() {
        let mut r = HttpRenderer::new(&SiteConfig::default()).unwrap();
        assert!(matches!(r.reload(), Err(HarvestError::NoPage)));
    }

    #[test]
    fn content_without_page_is_an_error() {
        let mut r = HttpRenderer::new(&SiteConfig::default()).unwrap();
        assert!(matches!(r.content(), Err(HarvestError::NoPage)));
        assert!(r.current_url().is_none());
    }

    #[test]
    fn click_without_page_is_an_error() {
        let mut r = HttpRenderer::new(&SiteConfig::default()).unwrap();
        assert!(r.click(&Sel::css("a")).is_err());
    }

    #[test]
    fn default_headers_convert() {
        let map = to_headermap(&SiteConfig::default().default_headers).unwrap();
        assert!(map.contains_key("accept-language"));
    }

    #[test]
    fn bad_header_rejected() {
        let mut h = std::collections::BTreeMap::new();
        h.insert("bad header".to_string(), "x".to_string());
        assert!(to_headermap(&h).is_err());
    }

    #[test]
    fn relative_goto_without_page_is_invalid() {
        let mut r = HttpRenderer::new(&SiteConfig::default()).unwrap();
        assert!(matches!(r.goto("/homedetails/1"), Err(HarvestError::InvalidUrl(_))));
    }
}
