#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Mercari photocard scraper.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use photocard_dataset::{null_progress, paths};
use photocard_scraper::{roster, scrape_phrase, scrape_phrases, webdriver_url_from_env};

#[derive(Parser)]
#[command(name = "photocard_scraper", about = "Mercari photocard scraper")]
struct Cli {
    /// WebDriver endpoint (defaults to `WEBDRIVER_URL` or local chromedriver)
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Directory for scraped CSVs
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Root directory for downloaded images
    #[arg(long)]
    images_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every member in the embedded rosters (default)
    All,
    /// Scrape a single search phrase
    Phrase {
        /// The search phrase, e.g. "ジミン フォトカード"
        phrase: String,
    },
    /// List the embedded rosters and their members
    Rosters,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let webdriver_url = cli.webdriver_url.unwrap_or_else(webdriver_url_from_env);
    let csv_dir = cli.csv_dir.unwrap_or_else(paths::scraped_csv_dir);
    let images_dir = cli.images_dir.unwrap_or_else(paths::images_dir);

    match cli.command.unwrap_or(Commands::All) {
        Commands::All => {
            let phrases = roster::all_search_phrases();
            log::info!("Scraping {} roster members", phrases.len());
            let outcomes = scrape_phrases(
                &webdriver_url,
                &phrases,
                &csv_dir,
                &images_dir,
                &null_progress(),
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
        }
        Commands::Phrase { phrase } => {
            let count = scrape_phrase(&webdriver_url, &phrase, &csv_dir, &images_dir).await?;
            log::info!("Scraped {count} unique listings for '{phrase}'");
        }
        Commands::Rosters => {
            for roster in roster::all_rosters() {
                println!("{} ({} members)", roster.name, roster.members.len());
                for member in &roster.members {
                    println!(
                        "  {:20} {:14} {}",
                        member.stage_name,
                        member.group,
                        member.search_phrase()
                    );
                }
            }
        }
    }

    Ok(())
}
