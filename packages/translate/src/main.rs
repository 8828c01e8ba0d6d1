#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the title translation stage.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use photocard_dataset::{null_progress, paths};
use photocard_translate::GoogleTranslator;

#[derive(Parser)]
#[command(
    name = "photocard_translate",
    about = "Translate merged listing titles to English"
)]
struct Cli {
    /// Directory of merged CSVs
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Path of the combined training CSV to write
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path of the persistent translation cache
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Number of concurrent translation requests (defaults to host
    /// parallelism)
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let csv_dir = cli.csv_dir.unwrap_or_else(paths::merged_csv_dir);
    let output = cli.output.unwrap_or_else(paths::training_csv_path);
    let cache = cli.cache.unwrap_or_else(paths::translation_cache_path);
    let workers = cli.workers.unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    });

    let translator = Arc::new(GoogleTranslator::ja_to_en()?);
    let written = photocard_translate::run(
        &csv_dir,
        &output,
        &cache,
        workers,
        translator,
        &null_progress(),
    )
    .await?;

    log::info!("Wrote {written} training rows to {}", output.display());
    Ok(())
}
