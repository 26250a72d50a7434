//! Split freshly walked summaries into reusable prior rows and work still to do.

use crate::types::{Identity, Listing};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Which half of a [`Reconciled`] a walked summary ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Reused,
    Fetched,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Prior rows, cloned verbatim, in walk order.
    pub reused: Vec<Listing>,
    /// Fresh summaries with no prior counterpart, in walk order.
    pub to_fetch: Vec<Listing>,
    /// Walk order across both halves.
    pub order: Vec<Origin>,
}

impl Reconciled {
    pub fn len(&self) -> usize {
        self.reused.len() + self.to_fetch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every fresh summary goes to `to_fetch`; only duplicates are dropped.
    pub fn all_fresh(fresh: Vec<Listing>) -> Self {
        let mut seen = HashSet::new();
        let to_fetch: Vec<Listing> = fresh
            .into_iter()
            .filter(|l| {
                let first = seen.insert(owned_key(l.identity()));
                if !first {
                    info!("discarding {}: duplicate of an earlier summary", l.address);
                }
                first
            })
            .collect();
        Self {
            reused: Vec::new(),
            order: vec![Origin::Fetched; to_fetch.len()],
            to_fetch,
        }
    }
}

/// Put reused and fetched rows back into walk order.
///
/// `fetched` is `to_fetch` after detail fetching, same length and order.
/// Rows left over on either side are appended.
pub fn interleave(order: &[Origin], reused: Vec<Listing>, fetched: Vec<Listing>) -> Vec<Listing> {
    let mut out = Vec::with_capacity(reused.len() + fetched.len());
    let mut reused = reused.into_iter();
    let mut fetched = fetched.into_iter();
    for origin in order {
        let next = match origin {
            Origin::Reused => reused.next(),
            Origin::Fetched => fetched.next(),
        };
        out.extend(next);
    }
    out.extend(reused);
    out.extend(fetched);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Url(String),
    Address(String),
}

fn owned_key(id: Identity<'_>) -> Key {
    match id {
        Identity::Url(u) => Key::Url(u.to_string()),
        Identity::Address(a) => Key::Address(a.to_string()),
    }
}

/// Match each fresh summary against `prior` by url, falling back to address.
///
/// Two rows that both carry a url are the same listing only when the urls are
/// equal; the address fallback applies when either side has no url.
pub fn reconcile(fresh: Vec<Listing>, prior: &[Listing]) -> Reconciled {
    let mut by_url: HashMap<&str, usize> = HashMap::new();
    let mut by_address: HashMap<&str, usize> = HashMap::new();
    let mut urlless_by_address: HashMap<&str, usize> = HashMap::new();
    for (idx, row) in prior.iter().enumerate() {
        let addr = row.address.trim();
        match row.url() {
            Some(u) => {
                by_url.entry(u).or_insert(idx);
            }
            None if !addr.is_empty() => {
                urlless_by_address.entry(addr).or_insert(idx);
            }
            None => {}
        }
        if !addr.is_empty() {
            by_address.entry(addr).or_insert(idx);
        }
    }

    let mut out = Reconciled::default();
    let mut seen_fresh: HashSet<Key> = HashSet::new();
    let mut used_prior: HashSet<usize> = HashSet::new();
    let mut emitted_urls: HashSet<String> = HashSet::new();

    for summary in fresh {
        if !seen_fresh.insert(owned_key(summary.identity())) {
            info!("discarding {}: duplicate of an earlier summary", summary.address);
            continue;
        }

        let addr = summary.address.trim();
        let matched = match summary.url() {
            Some(u) => by_url
                .get(u)
                .or_else(|| urlless_by_address.get(addr))
                .copied(),
            None => by_address.get(addr).copied(),
        };

        match matched {
            Some(idx) => {
                if !used_prior.insert(idx) {
                    info!(
                        "discarding {}: its stored row was already matched by an earlier summary",
                        summary.address
                    );
                    continue;
                }
                let row = prior[idx].clone();
                if let Some(u) = row.url() {
                    if !emitted_urls.insert(u.to_string()) {
                        warn!("discarding stored row {}: url {u} already emitted", row.address);
                        continue;
                    }
                }
                out.reused.push(row);
                out.order.push(Origin::Reused);
            }
            None => {
                if let Some(u) = summary.url() {
                    if !emitted_urls.insert(u.to_string()) {
                        info!("discarding {}: url {u} already covered by a reused row", summary.address);
                        continue;
                    }
                }
                out.to_fetch.push(summary);
                out.order.push(Origin::Fetched);
            }
        }
    }

    info!(
        reused = out.reused.len(),
        new = out.to_fetch.len(),
        "reconciled against {} prior rows",
        prior.len()
    );
    out
}
