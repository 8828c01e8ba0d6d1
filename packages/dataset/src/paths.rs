#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the pipeline's `data/` directory.
//!
//! All paths are relative to the project root's `data/` directory. Stage
//! binaries accept overrides on the command line; these are the defaults
//! that make the stages compose without any flags.

use std::path::{Path, PathBuf};

use photocard_models::normalize_phrase;

/// Suffix appended to the normalized search phrase to name a scraped CSV.
pub const SCRAPED_CSV_SUFFIX: &str = "_mercari.csv";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the directory holding raw scraped CSVs.
#[must_use]
pub fn scraped_csv_dir() -> PathBuf {
    data_dir().join("mercari_csv")
}

/// Returns the root directory for downloaded images.
#[must_use]
pub fn images_dir() -> PathBuf {
    data_dir().join("images")
}

/// Returns the per-phrase image directory for a search phrase.
#[must_use]
pub fn image_dir_for(phrase: &str) -> PathBuf {
    images_dir().join(normalize_phrase(phrase))
}

/// Returns the output CSV path for a search phrase.
#[must_use]
pub fn scraped_csv_for(phrase: &str) -> PathBuf {
    scraped_csv_dir().join(format!("{}{SCRAPED_CSV_SUFFIX}", normalize_phrase(phrase)))
}

/// Returns the directory holding merged (image-path-augmented) CSVs.
#[must_use]
pub fn merged_csv_dir() -> PathBuf {
    data_dir().join("mercari_merged")
}

/// Returns the path of the final combined training CSV.
#[must_use]
pub fn training_csv_path() -> PathBuf {
    data_dir().join("training.csv")
}

/// Returns the path of the persistent translation cache.
#[must_use]
pub fn translation_cache_path() -> PathBuf {
    data_dir().join("cache_translation").join("translation_cache.json")
}

/// Returns the directory holding serialized model artifacts.
#[must_use]
pub fn model_dir() -> PathBuf {
    data_dir().join("model")
}

/// Returns the default path of the regression head weight file.
#[must_use]
pub fn regressor_weights_path() -> PathBuf {
    model_dir().join("regressor.json")
}

/// Returns the default path of the fitted price scaler file.
#[must_use]
pub fn price_scaler_path() -> PathBuf {
    model_dir().join("price_scaler.json")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraped_csv_name_uses_normalized_phrase() {
        let path = scraped_csv_for("ジミン フォトカード");
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("ジミン_フォトカード_mercari.csv")
        );
    }

    #[test]
    fn image_dir_matches_csv_prefix() {
        let dir = image_dir_for("カリナ フォトカード");
        assert_eq!(
            dir.file_name().and_then(|n| n.to_str()),
            Some("カリナ_フォトカード")
        );
    }
}
