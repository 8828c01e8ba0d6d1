//! Full pipeline orchestrator.
//!
//! Chains scrape -> merge -> translate in a single interactive flow,
//! prompting for the phrase source and showing `indicatif` progress bars
//! for the long-running stages.

use std::sync::Arc;
use std::time::Instant;

use dialoguer::{Confirm, Input, MultiSelect};
use photocard_cli_utils::{IndicatifProgress, MultiProgress};
use photocard_dataset::paths;
use photocard_scraper::roster;
use photocard_translate::GoogleTranslator;

/// Steps available in the pipeline.
enum PipelineStep {
    Scrape,
    Merge,
    Translate,
}

impl PipelineStep {
    const ALL: &[Self] = &[Self::Scrape, Self::Merge, Self::Translate];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Scrape => "Scrape listings",
            Self::Merge => "Merge CSVs with images",
            Self::Translate => "Translate titles",
        }
    }
}

/// Runs the full pipeline orchestrator.
///
/// Prompts the user for pipeline steps and the phrase source, then
/// executes each selected step sequentially.
///
/// The `multi` parameter is the shared [`MultiProgress`] that is also
/// registered with the log bridge, so all `log::info!` output is
/// automatically suspended while progress bars redraw.
///
/// # Errors
///
/// Returns an error if user prompts or any pipeline step fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline_start = Instant::now();

    let step_labels: Vec<&str> = PipelineStep::ALL.iter().map(PipelineStep::label).collect();
    let defaults = vec![true; PipelineStep::ALL.len()];

    let selected_steps = MultiSelect::new()
        .with_prompt("Pipeline steps (space=toggle, a=all, enter=confirm)")
        .items(&step_labels)
        .defaults(&defaults)
        .interact()?;

    for idx in selected_steps {
        match PipelineStep::ALL[idx] {
            PipelineStep::Scrape => run_scrape(multi).await?,
            PipelineStep::Merge => run_merge()?,
            PipelineStep::Translate => run_translate(multi).await?,
        }
    }

    log::info!(
        "Pipeline finished in {:.1?}",
        pipeline_start.elapsed()
    );
    Ok(())
}

/// Runs the scrape stage interactively.
///
/// # Errors
///
/// Returns an error if the prompts fail. Individual phrase failures are
/// reported but do not abort the batch.
pub async fn run_scrape(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let phrases = prompt_phrases()?;
    if phrases.is_empty() {
        log::warn!("No search phrases selected, skipping scrape");
        return Ok(());
    }

    let step_start = Instant::now();
    let bar = IndicatifProgress::steps_bar(multi, "Scraping phrases", phrases.len() as u64);

    let outcomes = photocard_scraper::scrape_phrases(
        &photocard_scraper::webdriver_url_from_env(),
        &phrases,
        &paths::scraped_csv_dir(),
        &paths::images_dir(),
        &bar,
    )
    .await;

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.phrase.as_str())
        .collect();
    if !failed.is_empty() {
        log::warn!("{} phrases failed: {}", failed.len(), failed.join(", "));
    }
    log::info!("Scrape step finished in {:.1?}", step_start.elapsed());
    Ok(())
}

/// Runs the merge stage over the default directories.
///
/// # Errors
///
/// Returns an error if the scraped CSV directory cannot be listed.
pub fn run_merge() -> Result<(), Box<dyn std::error::Error>> {
    let step_start = Instant::now();
    let results = photocard_merge::process_dir(
        &paths::scraped_csv_dir(),
        &paths::images_dir(),
        &paths::merged_csv_dir(),
    )?;
    log::info!(
        "Merge step finished in {:.1?} ({} files)",
        step_start.elapsed(),
        results.len()
    );
    Ok(())
}

/// Runs the translate stage over the default directories.
///
/// # Errors
///
/// Returns an error if loading, a cache flush, or the final write fails.
pub async fn run_translate(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let step_start = Instant::now();
    let bar = IndicatifProgress::batch_bar(multi, "Translating titles");

    let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let written = photocard_translate::run(
        &paths::merged_csv_dir(),
        &paths::training_csv_path(),
        &paths::translation_cache_path(),
        workers,
        Arc::new(GoogleTranslator::ja_to_en()?),
        &bar,
    )
    .await?;

    log::info!(
        "Translate step finished in {:.1?} ({written} training rows)",
        step_start.elapsed()
    );
    Ok(())
}

/// Prompts for the phrase source: the embedded rosters or a custom list.
fn prompt_phrases() -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let use_rosters = Confirm::new()
        .with_prompt("Scrape every member in the embedded rosters?")
        .default(true)
        .interact()?;

    if use_rosters {
        return Ok(roster::all_search_phrases());
    }

    let raw: String = Input::new()
        .with_prompt("Comma-separated search phrases")
        .interact_text()?;
    Ok(raw
        .split(',')
        .map(|phrase| phrase.trim().to_owned())
        .filter(|phrase| !phrase.is_empty())
        .collect())
}
