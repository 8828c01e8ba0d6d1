#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the CSV/image merge stage.

use std::path::PathBuf;

use clap::Parser;
use photocard_dataset::paths;

#[derive(Parser)]
#[command(
    name = "photocard_merge",
    about = "Attach downloaded image paths to scraped listing CSVs"
)]
struct Cli {
    /// Directory of scraped CSVs
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Root directory of downloaded images
    #[arg(long)]
    image_root: Option<PathBuf>,

    /// Output directory for merged CSVs
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let csv_dir = cli.csv_dir.unwrap_or_else(paths::scraped_csv_dir);
    let image_root = cli.image_root.unwrap_or_else(paths::images_dir);
    let output_dir = cli.output_dir.unwrap_or_else(paths::merged_csv_dir);

    let results = photocard_merge::process_dir(&csv_dir, &image_root, &output_dir)?;
    for (file_name, stats) in &results {
        log::info!(
            "{file_name}: kept {} of {} rows",
            stats.merged_rows,
            stats.input_rows
        );
    }

    Ok(())
}
