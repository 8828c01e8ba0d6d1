#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Title translation stage.
//!
//! Concatenates every merged CSV, deduplicates by product URL, drops rows
//! whose image no longer exists on disk, and translates the surviving
//! Japanese titles to English through [`google::GoogleTranslator`] —
//! fanned out across workers, backed by the persistent
//! [`TranslationCache`](photocard_dataset::TranslationCache) so a title is
//! translated at most once per cache lifetime.

pub mod google;
pub mod pipeline;

use std::path::Path;

use photocard_models::{MergedListing, dedupe_by_product_url};
use unicode_normalization::UnicodeNormalization as _;

pub use google::{GoogleTranslator, TitleTranslator};
pub use pipeline::{FLUSH_EVERY, run, translate_titles};

/// Errors that can occur during translation.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// An HTTP request to the translation endpoint failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The translation response could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// Reading or writing a dataset file failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] photocard_dataset::DatasetError),
}

/// Normalizes an image path from a merged CSV.
///
/// Applies Unicode NFD normalization (matching how macOS filesystems store
/// Japanese file names) and strips the `@webp` marker so the path points at
/// the file as it exists on disk.
#[must_use]
pub fn clean_image_path(path: &str) -> String {
    path.nfd().collect::<String>().replace("@webp", "")
}

/// Loads every merged CSV in `csv_dir`, deduplicates by product URL (first
/// occurrence wins), normalizes image paths, and drops rows whose image no
/// longer exists on disk.
///
/// Unreadable files are logged and skipped.
///
/// # Errors
///
/// Returns [`TranslateError`] only if `csv_dir` itself cannot be listed.
pub fn load_merged_rows(csv_dir: &Path) -> Result<Vec<MergedListing>, TranslateError> {
    let mut rows = Vec::new();
    for path in photocard_dataset::csv::list_csv_files(csv_dir)? {
        match photocard_dataset::csv::read_merged(&path) {
            Ok(mut batch) => rows.append(&mut batch),
            Err(e) => log::warn!("Skipping {}: {e}", path.display()),
        }
    }

    let deduped = dedupe_by_product_url(rows);
    let total = deduped.len();

    let survivors: Vec<MergedListing> = deduped
        .into_iter()
        .filter_map(|mut row| {
            row.image_path = clean_image_path(&row.image_path);
            Path::new(&row.image_path).exists().then_some(row)
        })
        .collect();

    log::info!(
        "Loaded {} rows ({} dropped for missing images)",
        survivors.len(),
        total - survivors.len()
    );
    Ok(survivors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_webp_marker() {
        assert_eq!(clean_image_path("images/phrase/3@webp"), "images/phrase/3");
        assert_eq!(clean_image_path("images/phrase/3.jpg"), "images/phrase/3.jpg");
    }

    #[test]
    fn applies_nfd_normalization() {
        // "ジ" as a precomposed code point becomes base katakana + combining
        // voiced sound mark under NFD.
        let cleaned = clean_image_path("images/\u{30B8}/1.jpg");
        assert_eq!(cleaned, "images/\u{30B7}\u{3099}/1.jpg");
    }
}
