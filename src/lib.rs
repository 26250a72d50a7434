#![doc = include_str!("../README.md")]

pub mod challenge;
pub mod cli;
pub mod config;
pub mod detail;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod log;
pub mod pacing;
pub mod policy;
pub mod reconcile;
pub mod render;
pub mod selectors;
pub mod store;
pub mod summary;
pub mod types;
pub mod walk;

pub use config::Settings;
pub use error::{HarvestError, Result};
pub use harvest::{HarvestReport, Harvester};
pub use render::{HttpRenderer, Renderer};
pub use selectors::Sel;
pub use store::{CsvStore, DatasetStore};
pub use types::*;
