#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Merges scraped listing CSVs with their downloaded images.
//!
//! For every scraped CSV, the matching image directory is derived from the
//! file name (the scraper names both after the normalized search phrase).
//! Images are paired to rows by 1-based position: row `i` resolves to
//! `<i>.jpg` if it exists, else `<i>@webp` (the marketplace CDN's naming
//! for WebP thumbnails), else the row is dropped. Output CSVs carry the
//! original columns plus `image_path`, under the original file name in the
//! output directory.
//!
//! Each merge run regenerates its output from the original input pair, so
//! re-running over unchanged inputs is byte-identical.

use std::path::{Path, PathBuf};

use photocard_dataset::paths::SCRAPED_CSV_SUFFIX;
use photocard_models::MergedListing;

/// Errors that can occur while merging.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The expected image directory does not exist.
    #[error("image directory not found: {}", path.display())]
    MissingImageDir {
        /// The directory that was probed.
        path: PathBuf,
    },

    /// Reading or writing a dataset file failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] photocard_dataset::DatasetError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Row counts for one merged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Rows read from the scraped CSV.
    pub input_rows: usize,
    /// Rows written after dropping unresolvable images.
    pub merged_rows: usize,
}

/// Derives the image directory name from a scraped CSV file name by
/// stripping the scraper's suffix (falling back to the bare `.csv`
/// extension for files from other sources).
#[must_use]
pub fn image_dir_name(csv_file_name: &str) -> &str {
    csv_file_name
        .strip_suffix(SCRAPED_CSV_SUFFIX)
        .or_else(|| csv_file_name.strip_suffix(".csv"))
        .unwrap_or(csv_file_name)
}

/// Resolves the local image for a 1-based row position.
///
/// Probes `<row>.jpg` first, then `<row>@webp`; the jpg variant wins when
/// both exist.
#[must_use]
pub fn resolve_image(image_dir: &Path, row: usize) -> Option<PathBuf> {
    let jpg = image_dir.join(format!("{row}.jpg"));
    if jpg.exists() {
        return Some(jpg);
    }
    let webp = image_dir.join(format!("{row}@webp"));
    webp.exists().then_some(webp)
}

/// Merges one scraped CSV with its image directory.
///
/// Writes the augmented CSV under the original file name in `output_dir`
/// and returns the row counts.
///
/// # Errors
///
/// Returns [`MergeError::MissingImageDir`] if the derived image directory
/// does not exist, and [`MergeError::Dataset`] if the CSV cannot be read
/// or the output cannot be written.
pub fn merge_file(
    csv_path: &Path,
    image_root: &Path,
    output_dir: &Path,
) -> Result<MergeStats, MergeError> {
    let file_name = csv_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let image_dir = image_root.join(image_dir_name(file_name));

    if !image_dir.is_dir() {
        return Err(MergeError::MissingImageDir { path: image_dir });
    }

    let listings = photocard_dataset::csv::read_listings(csv_path)?;
    let input_rows = listings.len();

    let merged: Vec<MergedListing> = listings
        .into_iter()
        .enumerate()
        .filter_map(|(idx, listing)| {
            resolve_image(&image_dir, idx + 1)
                .map(|path| MergedListing::from_listing(listing, path.display().to_string()))
        })
        .collect();

    let output_path = output_dir.join(file_name);
    photocard_dataset::csv::write_merged(&output_path, &merged)?;
    log::info!(
        "Saved: {} ({} of {input_rows} rows)",
        output_path.display(),
        merged.len()
    );

    Ok(MergeStats {
        input_rows,
        merged_rows: merged.len(),
    })
}

/// Merges every CSV in `csv_dir`, skipping files whose image directory is
/// missing or whose CSV is unreadable.
///
/// Returns `(file name, stats)` for each successfully merged file, in file
/// name order.
///
/// # Errors
///
/// Returns [`MergeError`] only if `csv_dir` itself cannot be listed.
pub fn process_dir(
    csv_dir: &Path,
    image_root: &Path,
    output_dir: &Path,
) -> Result<Vec<(String, MergeStats)>, MergeError> {
    let mut results = Vec::new();

    for csv_path in photocard_dataset::csv::list_csv_files(csv_dir)? {
        let file_name = csv_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_owned();

        match merge_file(&csv_path, image_root, output_dir) {
            Ok(stats) => results.push((file_name, stats)),
            Err(e) => log::warn!("Skipping {file_name}: {e}"),
        }
    }

    log::info!(
        "Merge complete: {} files written to {}",
        results.len(),
        output_dir.display()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use photocard_models::Listing;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("photocard_merge_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn listing(n: usize) -> Listing {
        Listing {
            title: format!("card {n}"),
            price: "500".to_owned(),
            image_url: format!("https://static.mercdn.net/{n}.jpg"),
            product_url: format!("https://www.mercari.com/jp/items/m{n}"),
        }
    }

    fn write_scraped(dir: &Path, name: &str, rows: &[Listing]) -> PathBuf {
        let path = dir.join(name);
        photocard_dataset::csv::write_listings(&path, rows).unwrap();
        path
    }

    #[test]
    fn derives_image_dir_from_csv_name() {
        assert_eq!(image_dir_name("ジミン_フォトカード_mercari.csv"), "ジミン_フォトカード");
        assert_eq!(image_dir_name("other.csv"), "other");
    }

    #[test]
    fn jpg_wins_over_webp_when_both_exist() {
        let dir = temp_dir("precedence");
        std::fs::write(dir.join("1.jpg"), b"jpg").unwrap();
        std::fs::write(dir.join("1@webp"), b"webp").unwrap();

        let resolved = resolve_image(&dir, 1).unwrap();
        assert_eq!(resolved, dir.join("1.jpg"));
    }

    #[test]
    fn webp_is_used_when_jpg_is_absent() {
        let dir = temp_dir("webp_only");
        std::fs::write(dir.join("2@webp"), b"webp").unwrap();

        assert_eq!(resolve_image(&dir, 2).unwrap(), dir.join("2@webp"));
        assert!(resolve_image(&dir, 1).is_none());
    }

    #[test]
    fn keeps_only_rows_with_resolvable_images() {
        let root = temp_dir("partial");
        let csv_dir = root.join("csv");
        let image_root = root.join("images");
        let output_dir = root.join("out");
        std::fs::create_dir_all(&csv_dir).unwrap();
        std::fs::create_dir_all(image_root.join("phrase")).unwrap();

        let csv = write_scraped(
            &csv_dir,
            "phrase_mercari.csv",
            &[listing(1), listing(2), listing(3)],
        );
        // Only row 2's image exists.
        std::fs::write(image_root.join("phrase").join("2.jpg"), b"img").unwrap();

        let stats = merge_file(&csv, &image_root, &output_dir).unwrap();
        assert_eq!(stats.input_rows, 3);
        assert_eq!(stats.merged_rows, 1);

        let merged =
            photocard_dataset::csv::read_merged(&output_dir.join("phrase_mercari.csv")).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "card 2");
        assert_eq!(
            merged[0].image_path,
            image_root.join("phrase").join("2.jpg").display().to_string()
        );
    }

    #[test]
    fn rerunning_produces_byte_identical_output() {
        let root = temp_dir("idempotent");
        let csv_dir = root.join("csv");
        let image_root = root.join("images");
        let output_dir = root.join("out");
        std::fs::create_dir_all(&csv_dir).unwrap();
        std::fs::create_dir_all(image_root.join("phrase")).unwrap();

        let csv = write_scraped(&csv_dir, "phrase_mercari.csv", &[listing(1), listing(2)]);
        std::fs::write(image_root.join("phrase").join("1.jpg"), b"img").unwrap();
        std::fs::write(image_root.join("phrase").join("2@webp"), b"img").unwrap();

        merge_file(&csv, &image_root, &output_dir).unwrap();
        let first = std::fs::read(output_dir.join("phrase_mercari.csv")).unwrap();

        merge_file(&csv, &image_root, &output_dir).unwrap();
        let second = std::fs::read(output_dir.join("phrase_mercari.csv")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn missing_image_dir_skips_file_not_batch() {
        let root = temp_dir("missing_dir");
        let csv_dir = root.join("csv");
        let image_root = root.join("images");
        let output_dir = root.join("out");
        std::fs::create_dir_all(&csv_dir).unwrap();
        std::fs::create_dir_all(image_root.join("covered")).unwrap();

        write_scraped(&csv_dir, "orphan_mercari.csv", &[listing(1)]);
        write_scraped(&csv_dir, "covered_mercari.csv", &[listing(1)]);
        std::fs::write(image_root.join("covered").join("1.jpg"), b"img").unwrap();

        let results = process_dir(&csv_dir, &image_root, &output_dir).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "covered_mercari.csv");
        assert!(!output_dir.join("orphan_mercari.csv").exists());
    }

    #[test]
    fn malformed_csv_skips_file_not_batch() {
        let root = temp_dir("malformed");
        let csv_dir = root.join("csv");
        let image_root = root.join("images");
        let output_dir = root.join("out");
        std::fs::create_dir_all(&csv_dir).unwrap();
        std::fs::create_dir_all(image_root.join("bad")).unwrap();
        std::fs::create_dir_all(image_root.join("good")).unwrap();

        std::fs::write(csv_dir.join("bad_mercari.csv"), "not,a,listing\n1,2,3\n").unwrap();
        write_scraped(&csv_dir, "good_mercari.csv", &[listing(1)]);
        std::fs::write(image_root.join("good").join("1.jpg"), b"img").unwrap();

        let results = process_dir(&csv_dir, &image_root, &output_dir).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "good_mercari.csv");
    }
}
