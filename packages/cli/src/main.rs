#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive CLI orchestrator for the photocard price pipeline.
//!
//! Provides a unified entry point that lets the operator pick which stage
//! to run (scrape, merge, translate, serve) or chain the whole
//! scrape-merge-translate pipeline in one go.
//!
//! Uses `indicatif-log-bridge` (via [`photocard_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;

use dialoguer::Select;

/// Top-level tool selection for the pipeline.
enum Tool {
    RunPipeline,
    Scrape,
    Merge,
    Translate,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::RunPipeline,
        Self::Scrape,
        Self::Merge,
        Self::Translate,
        Self::Server,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunPipeline => "Run full pipeline (scrape, merge, translate)",
            Self::Scrape => "Scrape listings",
            Self::Merge => "Merge CSVs with images",
            Self::Translate => "Translate titles",
            Self::Server => "Start predictor server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = photocard_cli_utils::init_logger();

    println!("Photocard Price Pipeline");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::RunPipeline => pipeline::run(&multi).await?,
        Tool::Scrape => pipeline::run_scrape(&multi).await?,
        Tool::Merge => pipeline::run_merge()?,
        Tool::Translate => pipeline::run_translate(&multi).await?,
        Tool::Server => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(photocard_server::run_from_env())
            })
            .await??;
        }
    }

    Ok(())
}
