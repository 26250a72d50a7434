use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored for any field the extractor could not resolve.
pub const NOT_AVAILABLE: &str = "N/A";
pub const CAPTCHA_BLOCKED: &str = "CAPTCHA_BLOCKED";
pub const FETCH_ERROR: &str = "ERROR";

pub const RENTAL: &str = "Rental";

/// A geographic area queried on the source, as typed by the user ("Echo Park").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region(pub String);

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Region(name.into().trim().to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// URL path segment: lowercase, spaces become dashes.
    pub fn slug(&self) -> String {
        self.0
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// File name stem: spaces become underscores, case preserved.
    pub fn file_stem(&self) -> String {
        self.0.split_whitespace().collect::<Vec<_>>().join("_")
    }

    /// Inverse of [`Region::file_stem`].
    pub fn from_file_stem(stem: &str) -> Self {
        Region(stem.replace('_', " "))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Long-form description state of a listing.
///
/// Persisted as a plain string: the text itself, or one of the sentinels
/// `N/A`, `CAPTCHA_BLOCKED`, `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Description {
    #[default]
    Absent,
    Text(String),
    CaptchaBlocked,
    Error,
}

impl Description {
    pub fn as_str(&self) -> &str {
        match self {
            Description::Absent => NOT_AVAILABLE,
            Description::Text(t) => t,
            Description::CaptchaBlocked => CAPTCHA_BLOCKED,
            Description::Error => FETCH_ERROR,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Description::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Description::Text(_))
    }
}

impl From<String> for Description {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "" | NOT_AVAILABLE => Description::Absent,
            CAPTCHA_BLOCKED => Description::CaptchaBlocked,
            FETCH_ERROR => Description::Error,
            _ => Description::Text(raw),
        }
    }
}

impl From<Description> for String {
    fn from(d: Description) -> Self {
        match d {
            Description::Text(t) => t,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rental property record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub url: Option<String>,
    pub address: String,
    pub price: String,
    pub beds: String,
    pub baths: String,
    pub sqft: String,
    pub description: Description,
    pub listing_type: String,
    pub source_region: Option<Region>,
    pub page_number: Option<u32>,
    pub collected_at: Option<DateTime<Local>>,
}

/// Dedup identity key: url when present, else address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity<'a> {
    Url(&'a str),
    Address(&'a str),
}

impl Listing {
    /// Summary-only listing as produced from an index card.
    pub fn summary(address: impl Into<String>) -> Self {
        Self {
            url: None,
            address: address.into(),
            price: NOT_AVAILABLE.into(),
            beds: NOT_AVAILABLE.into(),
            baths: NOT_AVAILABLE.into(),
            sqft: NOT_AVAILABLE.into(),
            description: Description::Absent,
            listing_type: RENTAL.into(),
            source_region: None,
            page_number: None,
            collected_at: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Non-empty url, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn identity(&self) -> Identity<'_> {
        match self.url() {
            Some(u) => Identity::Url(u),
            None => Identity::Address(self.address.trim()),
        }
    }
}
