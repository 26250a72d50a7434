use crate::{error::*, pacing::Pacing, policy::*, types::Region};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where and how the source is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin relative links are resolved against.
    pub base_origin: String,
    /// Index URL with a `{slug}` placeholder for the region.
    pub index_url_template: String,
    /// Full index URLs for regions that need explicit search parameters.
    pub region_urls: BTreeMap<String, String>,
    pub user_agent: String,
    pub default_headers: BTreeMap<String, String>,
    pub navigation_timeout_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        );
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());

        Self {
            base_origin: "https://www.zillow.com".into(),
            index_url_template: "https://www.zillow.com/{slug}-ca/rentals/".into(),
            region_urls: BTreeMap::new(),
            user_agent: DEFAULT_USER_AGENT.into(),
            default_headers: headers,
            navigation_timeout_ms: 30_000,
        }
    }
}

impl SiteConfig {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_origin).map_err(|_| HarvestError::InvalidUrl(self.base_origin.clone()))
    }

    /// Index URL for a region: explicit override (case-insensitive name), else the template.
    pub fn index_url(&self, region: &Region) -> String {
        let wanted = region.name().to_lowercase();
        self.region_urls
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, url)| url.clone())
            .unwrap_or_else(|| self.index_url_template.replace("{slug}", &region.slug()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub target_count: usize,
    pub max_pages: u32,
    /// Description candidates must be longer than this many characters.
    pub min_description_chars: usize,
    /// Log a progress line every N detail pages.
    pub progress_every: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            target_count: 100,
            max_pages: 20,
            min_description_chars: 50,
            progress_every: 10,
        }
    }
}

/// Complete configuration of a harvest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site: SiteConfig,
    pub pacing: Pacing,
    pub limits: Limits,
    pub policy: HarvestPolicy,
    /// Ignore the prior dataset instead of reusing known listings.
    pub fresh: bool,
}

impl Settings {
    /// Read settings from a JSON file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let settings: Settings = serde_json::from_reader(file)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_policy(&self.policy)?;
        self.site.base_url()?;
        if self.limits.target_count == 0 {
            return Err(HarvestError::Config("limits.target_count must be > 0".into()));
        }
        if self.limits.max_pages == 0 {
            return Err(HarvestError::Config("limits.max_pages must be > 0".into()));
        }
        if let Some((name, _)) = self.pacing.ranges().iter().find(|(_, r)| !r.is_valid()) {
            return Err(HarvestError::Config(format!(
                "pacing.{name}: min_ms exceeds max_ms"
            )));
        }
        let (lo, hi) = self.pacing.scroll_fraction;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(HarvestError::Config(
                "pacing.scroll_fraction must be an ordered pair within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Default local data directory for datasets and the activity log.
pub fn default_data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("io", "rentharvest", "rentharvest").ok_or_else(|| {
        HarvestError::storage_error("initialization", "could not resolve data dir")
    })?;
    Ok(proj.data_local_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::DelayRange;

    #[test]
    fn index_url_uses_slug_template() {
        let site = SiteConfig::default();
        assert_eq!(
            site.index_url(&Region::new("Silver Lake")),
            "https://www.zillow.com/silver-lake-ca/rentals/"
        );
    }

    #[test]
    fn index_url_prefers_override() {
        let mut site = SiteConfig::default();
        site.region_urls
            .insert("Echo Park".into(), "https://example.com/echo?q=1".into());
        assert_eq!(
            site.index_url(&Region::new("echo park")),
            "https://example.com/echo?q=1"
        );
    }

    #[test]
    fn inverted_delay_rejected() {
        let mut s = Settings::default();
        s.pacing.before_detail = DelayRange::millis(10, 5);
        let err = s.validate().unwrap_err().to_string();
        assert!(err.contains("before_detail"));
    }

    #[test]
    fn zero_target_rejected() {
        let mut s = Settings::default();
        s.limits.target_count = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"limits":{"target_count":5},"fresh":true}"#).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.limits.target_count, 5);
        assert_eq!(s.limits.max_pages, 20);
        assert!(s.fresh);
    }
}
