#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Mercari photocard listing scraper.
//!
//! Drives a headless browser through a WebDriver endpoint to collect
//! photocard listings for a search phrase across a fixed set of price
//! bands ([`mercari`]), downloads each listing's thumbnail image
//! ([`images`]), and fans a batch of phrases out over a small pool of
//! independent sessions ([`batch`]). Search phrases for whole idol groups
//! come from the compile-time roster registry ([`roster`]).
//!
//! The scraper talks to a WebDriver server (chromedriver) at
//! `WEBDRIVER_URL`; each phrase gets its own session, so concurrent
//! phrases never share browser state.

pub mod batch;
pub mod images;
pub mod mercari;
pub mod roster;

pub use batch::{PhraseOutcome, SCRAPE_WORKERS, scrape_phrases};
pub use mercari::{PRICE_BANDS, PriceBand, scrape_phrase};

/// Environment variable naming the WebDriver endpoint.
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";

/// Returns the WebDriver endpoint URL from `WEBDRIVER_URL`, defaulting to
/// a local chromedriver.
#[must_use]
pub fn webdriver_url_from_env() -> String {
    std::env::var(WEBDRIVER_URL_ENV).unwrap_or_else(|_| "http://localhost:9515".to_string())
}

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Building the WebDriver HTTP connector failed.
    #[error("WebDriver TLS setup error: {0}")]
    Tls(String),

    /// Establishing a WebDriver session failed.
    #[error("WebDriver session error: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    /// A WebDriver command failed.
    #[error("WebDriver command error: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An image request completed with a non-success status.
    #[error("image request returned status {status}")]
    ImageStatus {
        /// The HTTP status returned by the image host.
        status: reqwest::StatusCode,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a dataset file failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] photocard_dataset::DatasetError),

    /// JSON serialization failed (WebDriver script arguments).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsing a listing card failed.
    #[error("Parse error: {0}")]
    Parse(String),
}
