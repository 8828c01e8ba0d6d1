#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared record types for the photocard price pipeline.
//!
//! Every stage exchanges data through CSV files on disk; the structs here
//! are the rows of those files ([`Listing`] for scraper output,
//! [`MergedListing`] after image resolution, [`TrainingRow`] after
//! translation). Field order matters — it defines the CSV column order.

use serde::{Deserialize, Serialize};

/// One scraped marketplace item.
///
/// `price` is kept as the raw yen string exactly as displayed on the
/// listing card (e.g. `"1,200"`); nothing downstream parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Listing {
    /// Listing title, as extracted from the thumbnail `aria-label`.
    pub title: String,
    /// Displayed price string.
    pub price: String,
    /// Thumbnail image URL.
    pub image_url: String,
    /// Absolute product page URL.
    pub product_url: String,
}

/// A [`Listing`] with its resolved local image file attached.
///
/// Produced by the merge stage; rows whose image could not be resolved
/// never become a `MergedListing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedListing {
    /// Listing title.
    pub title: String,
    /// Displayed price string.
    pub price: String,
    /// Thumbnail image URL.
    pub image_url: String,
    /// Absolute product page URL.
    pub product_url: String,
    /// Local path of the downloaded image.
    pub image_path: String,
}

impl MergedListing {
    /// Attaches a resolved image path to a scraped listing.
    #[must_use]
    pub fn from_listing(listing: Listing, image_path: String) -> Self {
        Self {
            title: listing.title,
            price: listing.price,
            image_url: listing.image_url,
            product_url: listing.product_url,
            image_path,
        }
    }
}

/// One row of the final training CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRow {
    /// English translation of the listing title.
    pub translated_title: String,
    /// Displayed price string, carried through unchanged.
    pub price: String,
    /// Local path of the downloaded image.
    pub image_path: String,
}

/// Normalizes a search phrase into a filesystem-safe name.
///
/// ASCII spaces become underscores; everything else (including Japanese
/// text) passes through unchanged. The result names both the output CSV
/// (`<normalized>_mercari.csv`) and the per-phrase image directory.
#[must_use]
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.replace(' ', "_")
}

/// Removes duplicate scraped listings, keeping the first occurrence.
///
/// Uniqueness is the full `(title, price, image_url, product_url)` tuple:
/// the same card relisted at a different price is a distinct row, but the
/// same card appearing in overlapping scroll batches is not.
#[must_use]
pub fn dedupe_scraped(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = std::collections::HashSet::new();
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.clone()))
        .collect()
}

/// Removes duplicate merged listings by `product_url`, keeping the first
/// occurrence.
///
/// The same product shows up once per search phrase that matched it; for
/// training we want each product exactly once.
#[must_use]
pub fn dedupe_by_product_url(rows: Vec<MergedListing>) -> Vec<MergedListing> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.product_url.clone()))
        .collect()
}
