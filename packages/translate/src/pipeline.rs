//! Cached, order-preserving parallel translation.
//!
//! Titles fan out over a bounded number of in-flight requests via
//! `buffered`, which yields results in submission order even though
//! completions across workers are unordered. Workers read the shared
//! cache and propose insertions; only this coordinator flushes it to disk
//! — every [`FLUSH_EVERY`] completed titles and once after the batch — so
//! a crash loses at most the in-flight tail.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt as _;
use photocard_dataset::{ProgressCallback, TranslationCache};
use photocard_models::{MergedListing, TrainingRow};

use crate::{TitleTranslator, TranslateError};

/// How many completed translations between cache flushes.
pub const FLUSH_EVERY: u64 = 100;

/// Translates one title, consulting the cache first.
///
/// Returns `None` for empty titles and for failed translations (which are
/// logged); failures are never cached, so a later run retries them.
async fn translate_cached(
    translator: &dyn TitleTranslator,
    cache: &TranslationCache,
    text: &str,
) -> Option<String> {
    let trimmed = text.trim();
    let key = TranslationCache::key_for(trimmed);

    if let Some(hit) = cache.get(&key) {
        return Some(hit);
    }
    if trimmed.is_empty() {
        return None;
    }

    match translator.translate(trimmed).await {
        Ok(translated) => {
            cache.insert(key, translated.clone());
            Some(translated)
        }
        Err(e) => {
            log::warn!("Translation failed for \"{trimmed}\": {e}");
            None
        }
    }
}

/// Translates every row's title, preserving input order, and drops rows
/// whose translation failed.
///
/// # Errors
///
/// Returns [`TranslateError`] if a cache flush fails. Per-title
/// translation failures only drop their own row.
pub async fn translate_titles(
    rows: Vec<MergedListing>,
    translator: Arc<dyn TitleTranslator>,
    cache: &Arc<TranslationCache>,
    workers: usize,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<TrainingRow>, TranslateError> {
    progress.set_total(rows.len() as u64);

    let mut stream = futures::stream::iter(rows.into_iter().map(|row| {
        let translator = Arc::clone(&translator);
        let cache = Arc::clone(cache);
        async move {
            let translated = translate_cached(translator.as_ref(), &cache, &row.title).await;
            (row, translated)
        }
    }))
    .buffered(workers.max(1));

    let mut out = Vec::new();
    let mut completed: u64 = 0;

    while let Some((row, translated)) = stream.next().await {
        completed += 1;
        progress.inc(1);

        if completed % FLUSH_EVERY == 0 {
            log::info!("Translated {completed} titles");
            cache.flush()?;
        }

        if let Some(translated_title) = translated {
            out.push(TrainingRow {
                translated_title,
                price: row.price,
                image_path: row.image_path,
            });
        }
    }

    cache.flush()?;
    progress.finish(format!("Translated {completed} titles"));
    Ok(out)
}

/// Runs the whole translation stage: load, translate, write the combined
/// training CSV. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`TranslateError`] if loading, a cache flush, or the final
/// write fails.
pub async fn run(
    csv_dir: &Path,
    output_csv: &Path,
    cache_path: &Path,
    workers: usize,
    translator: Arc<dyn TitleTranslator>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<usize, TranslateError> {
    let rows = crate::load_merged_rows(csv_dir)?;
    log::info!("Start translation of {} titles", rows.len());

    let cache = Arc::new(TranslationCache::open(cache_path)?);
    let translated = translate_titles(rows, translator, &cache, workers, progress).await?;

    photocard_dataset::csv::write_training(output_csv, &translated)?;
    log::info!(
        "Training CSV saved: {} ({} rows, cache holds {} translations)",
        output_csv.display(),
        translated.len(),
        cache.len()
    );
    Ok(translated.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use photocard_dataset::null_progress;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test translator that counts external calls and uppercases input.
    struct CountingTranslator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingTranslator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl TitleTranslator for CountingTranslator {
        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranslateError::Parse {
                    message: "stub failure".to_string(),
                });
            }
            Ok(format!("EN:{text}"))
        }
    }

    fn temp_cache(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("photocard_translate_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("translation_cache.json")
    }

    fn row(title: &str, url: &str) -> MergedListing {
        MergedListing {
            title: title.to_owned(),
            price: "500".to_owned(),
            image_url: "https://static.mercdn.net/1.jpg".to_owned(),
            product_url: url.to_owned(),
            image_path: "images/p/1.jpg".to_owned(),
        }
    }

    #[tokio::test]
    async fn identical_titles_cost_one_external_call() {
        let translator = CountingTranslator::new();
        let cache = Arc::new(TranslationCache::open(&temp_cache("dedup")).unwrap());
        let rows = vec![
            row("ジミン トレカ", "https://m/a"),
            row("ジミン トレカ", "https://m/b"),
        ];

        let out = translate_titles(rows, translator.clone(), &cache, 1, &null_progress())
            .await
            .unwrap();

        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].translated_title, out[1].translated_title);
    }

    #[tokio::test]
    async fn later_run_is_served_from_the_cache() {
        let cache_path = temp_cache("across_runs");

        let first = CountingTranslator::new();
        let cache = Arc::new(TranslationCache::open(&cache_path).unwrap());
        translate_titles(
            vec![row("カリナ トレカ", "https://m/a")],
            first.clone(),
            &cache,
            1,
            &null_progress(),
        )
        .await
        .unwrap();
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);

        // Fresh cache object over the same file, as a later run would see.
        let second = CountingTranslator::new();
        let reopened = Arc::new(TranslationCache::open(&cache_path).unwrap());
        let out = translate_titles(
            vec![row("カリナ トレカ", "https://m/b")],
            second.clone(),
            &reopened,
            1,
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert_eq!(out[0].translated_title, "EN:カリナ トレカ");
    }

    #[tokio::test]
    async fn failed_translations_drop_their_row_only() {
        let translator = CountingTranslator::failing();
        let cache = Arc::new(TranslationCache::open(&temp_cache("failures")).unwrap());
        let rows = vec![row("壊れたタイトル", "https://m/a")];

        let out = translate_titles(rows, translator, &cache, 2, &null_progress())
            .await
            .unwrap();

        assert!(out.is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn empty_titles_skip_the_network_and_the_cache() {
        let translator = CountingTranslator::new();
        let cache = Arc::new(TranslationCache::open(&temp_cache("empty")).unwrap());
        let rows = vec![row("   ", "https://m/a"), row("本物", "https://m/b")];

        let out = translate_titles(rows, translator.clone(), &cache, 1, &null_progress())
            .await
            .unwrap();

        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].translated_title, "EN:本物");
    }

    #[tokio::test]
    async fn results_preserve_input_order() {
        let translator = CountingTranslator::new();
        let cache = Arc::new(TranslationCache::open(&temp_cache("order")).unwrap());
        let rows: Vec<MergedListing> = (0..20)
            .map(|i| row(&format!("タイトル{i}"), &format!("https://m/{i}")))
            .collect();

        let out = translate_titles(rows, translator, &cache, 8, &null_progress())
            .await
            .unwrap();

        let titles: Vec<String> = (0..20).map(|i| format!("EN:タイトル{i}")).collect();
        let got: Vec<String> = out.into_iter().map(|r| r.translated_title).collect();
        assert_eq!(got, titles);
    }
}
