use crate::{error::*, selectors::*};
use serde::{Deserialize, Serialize};

/// Per-field strategy lists applied inside one listing card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSelectors {
    pub address: Vec<Sel>,
    pub price: Vec<Sel>,
    pub beds: Vec<Sel>,
    pub baths: Vec<Sel>,
    pub sqft: Vec<Sel>,
    pub link: Vec<Sel>,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            address: sels(&[
                "address",
                "[data-test=\"property-card-addr\"]",
                ".property-address",
                ".list-card-addr",
                ".property-address-text",
            ]),
            price: sels(&[
                "[data-test=\"property-card-price\"]",
                ".property-price",
                ".price",
                ".list-card-price",
                ".property-price-text",
            ]),
            beds: sels(&[
                "[data-test=\"property-card-beds\"]",
                ".beds",
                ".bedrooms",
                ".list-card-beds",
                ".property-beds",
            ]),
            baths: sels(&[
                "[data-test=\"property-card-baths\"]",
                ".baths",
                ".bathrooms",
                ".list-card-baths",
                ".property-baths",
            ]),
            sqft: sels(&[
                "[data-test=\"property-card-sqft\"]",
                ".sqft",
                ".square-feet",
                ".list-card-sqft",
                ".property-sqft",
            ]),
            link: sels(&[
                "[data-test=\"property-card-link\"]",
                "a",
                ".property-link",
                ".list-card-link",
                ".property-card-link",
            ]),
        }
    }
}

/// Signals that a bot-verification screen is in front of the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeProbes {
    /// Elements known to host challenge widgets.
    pub structural: Vec<Sel>,
    /// Lowercase phrases searched in the full page markup.
    pub phrases: Vec<String>,
}

impl Default for ChallengeProbes {
    fn default() -> Self {
        Self {
            structural: sels(&[
                "#px-captcha-wrapper",
                ".px-captcha-container",
                "[id*=\"captcha\"]",
                "[class*=\"captcha\"]",
                "iframe[title*=\"verification\"]",
                "iframe[title*=\"challenge\"]",
            ]),
            phrases: [
                "press & hold to confirm you are",
                "human verification challenge",
                "confirm you are a human",
                "not a bot",
                "reference id",
                "px-captcha",
                "recaptcha",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Every priority-ordered lookup the harvester uses against the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestPolicy {
    /// Listing-card containers on an index page.
    pub cards: Vec<Sel>,
    pub fields: CardSelectors,
    /// Total-results banner, logged for progress only.
    pub result_count: Vec<Sel>,
    pub load_more: Vec<Sel>,
    pub next_page: Vec<Sel>,
    /// "Show more" expanders on a detail page.
    pub show_more: Vec<Sel>,
    pub description: Vec<Sel>,
    pub challenge: ChallengeProbes,
}

impl Default for HarvestPolicy {
    fn default() -> Self {
        Self {
            cards: sels(&[
                "[data-test=\"property-card\"]",
                ".property-card",
                "[data-testid=\"property-card\"]",
                ".list-card",
                ".property-card-container",
                ".list-card-container",
            ]),
            fields: CardSelectors::default(),
            result_count: sels(&[
                ".result-count",
                ".search-subtitle h2",
                "[data-test=\"result-count\"]",
            ]),
            load_more: vec![
                Sel::with_text("button", "Show more"),
                Sel::with_text("button", "Load more"),
                Sel::with_text("button", "View more"),
                Sel::css("[data-test=\"load-more\"]"),
                Sel::css(".load-more-button"),
                Sel::css(".show-more-button"),
            ],
            next_page: vec![
                Sel::css("a[aria-disabled=\"false\"][rel=\"next\"][title=\"Next page\"]"),
                Sel::css("a[rel=\"next\"][title=\"Next page\"]"),
                Sel::css("a[aria-disabled=\"false\"][rel=\"next\"]"),
                Sel::css("a[rel=\"next\"]"),
                Sel::css("a[title=\"Next page\"]"),
                Sel::css("button[aria-label=\"Next page\"]"),
                Sel::css("a[aria-label=\"Next page\"]"),
                Sel::with_text("button", "Next"),
                Sel::with_text("a", "Next"),
                Sel::css("[data-test=\"pagination-next\"]"),
                Sel::css(".pagination-next"),
            ],
            show_more: vec![
                Sel::with_text("button", "Show more"),
                Sel::css("[data-testid=\"show-more-button\"]"),
                Sel::css(".show-more-button"),
                Sel::with_text("button", "Read more"),
            ],
            description: sels(&[
                "[data-testid=\"description\"]",
                ".ds-overview-section .Text-c11n-8-109-3__sc-aiai24-0",
                ".sc-uhnfH .Text-c11n-8-109-3__sc-aiai24-0",
                ".RTNKi .Text-c11n-8-109-3__sc-aiai24-0",
                ".gycwvU",
                ".cEHZrB",
                ".property-description",
                ".description",
                ".summary",
                ".property-details",
                "[data-test=\"property-description\"]",
                ".overview-section",
                ".property-overview",
                "article .Text-c11n-8-109-3__sc-aiai24-0",
                ".Spacer-c11n-8-109-3__sc-17suqs2-0 article",
                ".bgKNvw article",
                ".property-content",
                ".listing-description",
                "p",
                ".content",
                ".text",
            ]),
            challenge: ChallengeProbes::default(),
        }
    }
}

pub fn validate_policy(p: &HarvestPolicy) -> Result<()> {
    if p.cards.is_empty() {
        return Err(HarvestError::Config("policy.cards cannot be empty".into()));
    }
    if p.fields.address.is_empty() {
        return Err(HarvestError::Config(
            "policy.fields.address cannot be empty".into(),
        ));
    }
    if p.description.is_empty() {
        return Err(HarvestError::Config(
            "policy.description cannot be empty".into(),
        ));
    }
    Ok(())
}
