//! Randomized waits between renderer actions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive range of milliseconds a wait is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub const fn millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn secs(min: u64, max: u64) -> Self {
        Self {
            min_ms: min * 1000,
            max_ms: max * 1000,
        }
    }

    /// Fixed wait with no jitter.
    pub const fn fixed_secs(s: u64) -> Self {
        Self::secs(s, s)
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    /// Uniform draw within the range.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// All waits of a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// After the index page first loads.
    pub index_settle: DelayRange,
    pub scroll_steps: u32,
    pub scroll_interval: DelayRange,
    /// Fraction of page height each scroll targets, drawn per step.
    pub scroll_fraction: (f64, f64),
    /// After the scroll burst, before extraction.
    pub post_scroll_settle: DelayRange,
    pub after_load_more: DelayRange,
    pub after_next_click: DelayRange,
    pub between_pages: DelayRange,
    pub before_detail: DelayRange,
    pub after_detail_load: DelayRange,
    pub before_show_more: DelayRange,
    pub after_show_more: DelayRange,
    /// Window granted to a human to clear a challenge.
    pub challenge_wait: DelayRange,
    /// Between two regions of one invocation.
    pub region_cooldown: DelayRange,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            index_settle: DelayRange::secs(15, 25),
            scroll_steps: 25,
            scroll_interval: DelayRange::secs(2, 4),
            scroll_fraction: (0.8, 1.0),
            post_scroll_settle: DelayRange::secs(8, 12),
            after_load_more: DelayRange::fixed_secs(3),
            after_next_click: DelayRange::fixed_secs(5),
            between_pages: DelayRange::secs(3, 6),
            before_detail: DelayRange::secs(5, 10),
            after_detail_load: DelayRange::secs(6, 12),
            before_show_more: DelayRange::secs(1, 2),
            after_show_more: DelayRange::fixed_secs(2),
            challenge_wait: DelayRange::fixed_secs(30),
            region_cooldown: DelayRange::secs(60, 120),
        }
    }
}

impl Pacing {
    /// No waits at all; scroll burst reduced to a single step.
    pub fn none() -> Self {
        Self {
            index_settle: DelayRange::ZERO,
            scroll_steps: 1,
            scroll_interval: DelayRange::ZERO,
            scroll_fraction: (1.0, 1.0),
            post_scroll_settle: DelayRange::ZERO,
            after_load_more: DelayRange::ZERO,
            after_next_click: DelayRange::ZERO,
            between_pages: DelayRange::ZERO,
            before_detail: DelayRange::ZERO,
            after_detail_load: DelayRange::ZERO,
            before_show_more: DelayRange::ZERO,
            after_show_more: DelayRange::ZERO,
            challenge_wait: DelayRange::ZERO,
            region_cooldown: DelayRange::ZERO,
        }
    }

    pub fn ranges(&self) -> [(&'static str, DelayRange); 12] {
        [
            ("index_settle", self.index_settle),
            ("scroll_interval", self.scroll_interval),
            ("post_scroll_settle", self.post_scroll_settle),
            ("after_load_more", self.after_load_more),
            ("after_next_click", self.after_next_click),
            ("between_pages", self.between_pages),
            ("before_detail", self.before_detail),
            ("after_detail_load", self.after_detail_load),
            ("before_show_more", self.before_show_more),
            ("after_show_more", self.after_show_more),
            ("challenge_wait", self.challenge_wait),
            ("region_cooldown", self.region_cooldown),
        ]
    }

    /// Random scroll target in `scroll_fraction`.
    pub fn scroll_target(&self) -> f64 {
        let (lo, hi) = self.scroll_fraction;
        if hi <= lo {
            return lo;
        }
        rand::thread_rng().gen_range(lo..=hi)
    }
}

/// Blocking sleeper drawing jittered waits from a [`Pacing`].
#[derive(Debug, Clone)]
pub struct Pacer {
    pacing: Pacing,
}

impl Pacer {
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Sleep for a draw from `range`; returns the slept duration.
    pub fn pause(&self, range: DelayRange) -> Duration {
        let d = range.sample();
        if !d.is_zero() {
            std::thread::sleep(d);
        }
        d
    }
}
