//! Persistent translation cache.
//!
//! A flat map from the MD5 hex digest of the trimmed source text to its
//! translation, persisted as one JSON object. Shared across translation
//! workers behind an `Arc`; workers read and propose insertions, and only
//! the pipeline coordinator calls [`TranslationCache::flush`]. The cache
//! never evicts — a given source text is translated at most once for the
//! lifetime of the cache file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::DatasetError;

/// Shared, disk-backed translation cache.
pub struct TranslationCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl TranslationCache {
    /// Opens the cache at `path`, loading existing entries if the file
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if an existing cache file cannot be read
    /// or parsed.
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };

        log::info!(
            "Opened translation cache at {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// Computes the cache key for a source text: the MD5 hex digest of the
    /// trimmed text.
    #[must_use]
    pub fn key_for(text: &str) -> String {
        let mut context = md5::Context::new();
        context.consume(text.trim().as_bytes());
        format!("{:x}", context.finalize())
    }

    /// Looks up a cached translation by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Inserts a translation. An existing entry for the same key is left
    /// untouched — the first translation wins.
    pub fn insert(&self, key: String, translated: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(translated);
    }

    /// Returns the number of cached translations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the current entries to disk, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if serialization or the write fails.
    pub fn flush(&self) -> Result<(), DatasetError> {
        if let Some(parent) = self.path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let serialized = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&*entries)?
        };
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}
