//! Word frequencies and price statistics over a stored dataset.

use crate::error::Result;
use crate::store::DatasetStore;
use crate::types::{Listing, Region};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

const ENGLISH: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just",
    "don", "should", "now", "ain", "aren", "couldn", "didn", "doesn", "hadn", "hasn", "haven",
    "isn", "mightn", "mustn", "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

const REAL_ESTATE: &[&str] = &[
    // listing boilerplate
    "home", "property", "house", "listing", "features", "includes", "located", "offers",
    "contact", "information", "price", "sale", "bedroom", "bathroom", "bath", "bed", "sq",
    "ft", "square", "feet", "year", "built", "call", "today", "agent", "new", "view", "tour",
    "zillow", "apartment", "unit", "rental", "rent", "available", "lease", "monthly",
    "deposit", "utilities", "included", "pets", "parking", "laundry",
    // street and building words
    "apt", "blvd", "dr", "st", "ave", "street", "drive", "boulevard", "avenue", "road", "lane",
    "place", "court", "way", "circle", "terrace", "plaza", "floor", "suite", "building",
    "complex", "community", "residence", "residential",
    // marketing adjectives
    "luxury", "premium", "exclusive", "modern", "contemporary", "traditional", "spacious",
    "cozy", "charming", "beautiful", "stunning", "gorgeous", "amazing", "perfect", "ideal",
    "wonderful", "fantastic", "excellent", "outstanding", "convenient", "close", "near",
    "walking", "distance", "minutes", "blocks", "downtown", "uptown", "midtown", "suburban",
    "urban", "commercial",
    // place names
    "beverly", "hills", "hollywood", "venice", "westwood", "brentwood", "encino", "tarzana",
    "calabasas", "malibu", "torrance", "hawthorne", "gardena", "inglewood", "compton",
    "carson", "wilmington", "lomita", "northridge", "reseda", "chatsworth", "tujunga",
    "sunland", "glendale", "burbank", "pasadena", "altadena", "arcadia", "monrovia", "duarte",
    "azusa", "covina", "walnut", "industry", "bassett", "irwindale", "rosemead", "alhambra",
    "montebello", "commerce", "cudahy", "bell", "maywood", "vernon", "lynwood", "paramount",
    "downey", "norwalk", "whittier", "cerritos", "artesia", "lakewood", "cypress",
    "westminster", "anaheim", "fullerton", "placentia", "brea",
];

/// Immutable set of lowercase words ignored when counting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopwordSet(BTreeSet<String>);

impl StopwordSet {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopwordSet(words.into_iter().map(|w| w.as_ref().to_lowercase()).collect())
    }

    pub fn english() -> Self {
        Self::new(ENGLISH.iter())
    }

    pub fn real_estate() -> Self {
        Self::new(REAL_ESTATE.iter())
    }

    pub fn union(&self, other: &StopwordSet) -> Self {
        StopwordSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// Upper median: element `n / 2` of the sorted prices.
    pub median: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: Region,
    pub listings: usize,
    pub described: usize,
    /// Share of listings with a real description, 0.0 when there are none.
    pub description_rate: f64,
    pub top_words: Vec<WordCount>,
    pub prices: Option<PriceStats>,
}

/// One row of the cross-region comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionComparison {
    pub region: Region,
    pub listings: usize,
    /// `max - min` over parseable prices.
    pub price_range: Option<u64>,
    pub prices: Option<PriceStats>,
}

pub struct Summarizer {
    stopwords: StopwordSet,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(StopwordSet::english().union(&StopwordSet::real_estate()))
    }
}

impl Summarizer {
    pub fn new(stopwords: StopwordSet) -> Self {
        Self { stopwords }
    }

    /// Counts sorted by count descending, then word ascending.
    pub fn word_frequencies(&self, rows: &[Listing]) -> Vec<WordCount> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in rows.iter().filter_map(|l| l.description.text()) {
            // Internal hyphens keep a compound together; `keeps` then rejects it.
            for token in text.split(|c: char| !c.is_alphanumeric() && c != '-') {
                let word = token.trim_matches('-').to_lowercase();
                if self.keeps(&word) {
                    *counts.entry(word).or_insert(0) += 1;
                }
            }
        }

        let mut out: Vec<WordCount> = counts
            .into_iter()
            .map(|(word, count)| WordCount { word, count })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        out
    }

    fn keeps(&self, word: &str) -> bool {
        word.chars().count() > 2
            && word.chars().all(char::is_alphabetic)
            && !self.stopwords.contains(word)
    }

    pub fn price_stats(&self, rows: &[Listing]) -> Option<PriceStats> {
        let mut prices: Vec<u64> = rows.iter().filter_map(|l| numeric_price(&l.price)).collect();
        if prices.is_empty() {
            return None;
        }
        prices.sort_unstable();
        let count = prices.len();
        let sum: f64 = prices.iter().map(|p| *p as f64).sum();
        Some(PriceStats {
            count,
            min: prices[0],
            max: prices[count - 1],
            mean: sum / count as f64,
            median: prices[count / 2],
        })
    }

    pub fn summarize(&self, region: &Region, rows: &[Listing], top: usize) -> RegionSummary {
        let described = rows.iter().filter(|l| l.description.is_text()).count();
        let mut top_words = self.word_frequencies(rows);
        top_words.truncate(top);
        RegionSummary {
            region: region.clone(),
            listings: rows.len(),
            described,
            description_rate: if rows.is_empty() {
                0.0
            } else {
                described as f64 / rows.len() as f64
            },
            top_words,
            prices: self.price_stats(rows),
        }
    }

    /// Listing count and price figures for every region the store holds.
    ///
    /// A dataset that cannot be read is skipped with a warning.
    pub fn compare<S: DatasetStore + ?Sized>(&self, store: &S) -> Result<Vec<RegionComparison>> {
        let mut out = Vec::new();
        for region in store.list()? {
            let rows = match store.load(&region) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("skipping {region} in comparison: {e}");
                    continue;
                }
            };
            let prices = self.price_stats(&rows);
            out.push(RegionComparison {
                listings: rows.len(),
                price_range: prices.as_ref().map(|p| p.max - p.min),
                prices,
                region,
            });
        }
        if out.len() < 2 {
            info!("only {} region(s) stored; a comparison needs at least two", out.len());
        }
        Ok(out)
    }
}

/// All digits of a price string as one number ("$2,950/mo" is 2950).
pub fn numeric_price(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
