//! Bounded fan-out over a batch of search phrases.
//!
//! Each phrase runs one full scrape-and-download cycle in its own
//! WebDriver session; at most [`SCRAPE_WORKERS`] run at once. Phrases
//! share no state, so one phrase failing leaves the others untouched.
//! Every phrase's result is collected and a summary is logged — nothing
//! is fire-and-forget.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt as _;
use photocard_dataset::ProgressCallback;

use crate::ScrapeError;
use crate::mercari;

/// Maximum number of concurrent scrape sessions.
pub const SCRAPE_WORKERS: usize = 4;

/// The result of scraping one phrase.
pub struct PhraseOutcome {
    /// The search phrase.
    pub phrase: String,
    /// Unique listing count on success, or the error that stopped the
    /// phrase.
    pub result: Result<usize, ScrapeError>,
}

/// Scrapes every phrase, at most [`SCRAPE_WORKERS`] at a time.
///
/// Returns one [`PhraseOutcome`] per input phrase. Completion order across
/// workers is unordered; the returned vector is in completion order.
pub async fn scrape_phrases(
    webdriver_url: &str,
    phrases: &[String],
    csv_dir: &Path,
    images_root: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<PhraseOutcome> {
    progress.set_total(phrases.len() as u64);

    let outcomes: Vec<PhraseOutcome> = futures::stream::iter(phrases.iter().cloned())
        .map(|phrase| {
            let progress = Arc::clone(progress);
            async move {
                log::info!("Scraping phrase '{phrase}'");
                let result = mercari::scrape_phrase(webdriver_url, &phrase, csv_dir, images_root)
                    .await
                    .inspect_err(|e| log::error!("Scrape failed for '{phrase}': {e}"));
                progress.inc(1);
                PhraseOutcome { phrase, result }
            }
        })
        .buffer_unordered(SCRAPE_WORKERS)
        .collect()
        .await;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    let listings: usize = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .sum();
    log::info!(
        "Scrape batch complete: {} phrases, {listings} unique listings, {failed} failed",
        outcomes.len()
    );
    progress.finish(format!("Scraped {} phrases ({failed} failed)", outcomes.len()));

    outcomes
}
