//! Typed CSV readers and writers for the pipeline record types.
//!
//! All files carry a header row and are written in a deterministic order,
//! so re-running a stage over unchanged inputs reproduces its output
//! byte-for-byte.

use std::path::{Path, PathBuf};

use photocard_models::{Listing, MergedListing, TrainingRow};

use crate::DatasetError;

/// Lists the `*.csv` files directly inside `dir`, sorted by file name.
///
/// Sorting keeps batch stages deterministic regardless of directory
/// enumeration order.
///
/// # Errors
///
/// Returns [`DatasetError`] if the directory cannot be read.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("csv")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Reads a scraped listings CSV.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be opened or any row fails
/// to deserialize.
pub fn read_listings(path: &Path) -> Result<Vec<Listing>, DatasetError> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize()
        .map(|row| row.map_err(DatasetError::from))
        .collect()
}

/// Writes a scraped listings CSV, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be written.
pub fn write_listings(path: &Path, listings: &[Listing]) -> Result<(), DatasetError> {
    write_rows(path, listings)
}

/// Reads a merged listings CSV.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be opened or any row fails
/// to deserialize.
pub fn read_merged(path: &Path) -> Result<Vec<MergedListing>, DatasetError> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize()
        .map(|row| row.map_err(DatasetError::from))
        .collect()
}

/// Writes a merged listings CSV, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be written.
pub fn write_merged(path: &Path, rows: &[MergedListing]) -> Result<(), DatasetError> {
    write_rows(path, rows)
}

/// Writes the final training CSV, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be written.
pub fn write_training(path: &Path, rows: &[TrainingRow]) -> Result<(), DatasetError> {
    write_rows(path, rows)
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
