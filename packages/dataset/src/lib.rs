#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! On-disk dataset layer for the photocard price pipeline.
//!
//! Every pipeline stage communicates through files under `data/`: scraped
//! CSVs, downloaded images, merged CSVs, the training CSV, and the JSON
//! translation cache. This crate owns the canonical layout ([`paths`]),
//! typed CSV read/write helpers ([`csv`]), the persistent translation
//! cache ([`translation_cache`]), and the [`ProgressCallback`] reporting
//! seam used by the long-running stages.

pub mod csv;
pub mod paths;
pub mod progress;
pub mod translation_cache;

pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use translation_cache::TranslationCache;

/// Errors that can occur in the dataset layer.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
