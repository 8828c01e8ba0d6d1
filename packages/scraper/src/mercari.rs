//! Mercari JP search scraping for a single phrase.
//!
//! One WebDriver session per phrase. The search is partitioned into six
//! fixed, non-overlapping price bands so that no band exceeds Mercari's
//! lazy-load result ceiling; each band is scrolled to the bottom until
//! the page height stops growing, then every item cell is parsed.
//!
//! A band whose results never appear within the wait timeout is skipped
//! with a warning; a single card that fails to parse is skipped with an
//! error log. Neither aborts the phrase.

use std::path::Path;
use std::time::Duration;

use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use photocard_models::{Listing, dedupe_scraped, normalize_phrase};

use crate::ScrapeError;
use crate::images;

/// One price interval used to partition search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBand {
    /// Inclusive lower bound in yen.
    pub min: u32,
    /// Inclusive upper bound in yen; `None` means unbounded.
    pub max: Option<u32>,
}

/// The fixed, non-overlapping price bands, in ascending order.
pub const PRICE_BANDS: [PriceBand; 6] = [
    PriceBand {
        min: 300,
        max: Some(800),
    },
    PriceBand {
        min: 801,
        max: Some(1500),
    },
    PriceBand {
        min: 1501,
        max: Some(5000),
    },
    PriceBand {
        min: 5001,
        max: Some(10_000),
    },
    PriceBand {
        min: 10_001,
        max: Some(40_000),
    },
    PriceBand {
        min: 40_001,
        max: None,
    },
];

const BASE_URL: &str = "https://www.mercari.com";

/// How long to wait for the first item cell before skipping a band.
const RESULTS_TIMEOUT: Duration = Duration::from_secs(15);
/// Settle time after each scroll-to-bottom before re-reading the height.
const SCROLL_SETTLE: Duration = Duration::from_secs(2);
/// Settle time after scrolling an individual card into view.
const ITEM_SETTLE: Duration = Duration::from_millis(300);

const ITEM_CELL: &str = r#"li[data-testid="item-cell"]"#;
const THUMBNAIL_LINK: &str = r#"a[data-testid="thumbnail-link"]"#;
const THUMBNAIL_IMAGE: &str = r#"div[role="img"]"#;
const PRICE_SPAN: &str = "span.number__6b270ca7";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

impl PriceBand {
    /// Human-readable `min-max` label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        self.max.map_or_else(
            || format!("{}-", self.min),
            |max| format!("{}-{max}", self.min),
        )
    }

    /// Builds the Mercari search URL for this band.
    #[must_use]
    pub fn search_url(&self, phrase: &str) -> String {
        let keyword = urlencoding::encode(phrase);
        match self.max {
            Some(max) => format!(
                "{BASE_URL}/jp/search/?keyword={keyword}&price_min={}&price_max={max}",
                self.min
            ),
            None => format!(
                "{BASE_URL}/jp/search/?keyword={keyword}&price_min={}",
                self.min
            ),
        }
    }
}

/// Scrapes one search phrase across all price bands.
///
/// Writes the deduplicated listings to
/// `<csv_dir>/<normalized-phrase>_mercari.csv`, downloads every listing
/// image into `<images_root>/<normalized-phrase>/`, and returns the number
/// of unique listings.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the WebDriver session cannot be established
/// or a non-skippable command fails. Band wait timeouts, per-card parse
/// failures and image download failures are logged and skipped instead.
pub async fn scrape_phrase(
    webdriver_url: &str,
    phrase: &str,
    csv_dir: &Path,
    images_root: &Path,
) -> Result<usize, ScrapeError> {
    let client = connect(webdriver_url).await?;

    let scraped = collect_bands(&client, phrase).await;

    if let Err(e) = client.close().await {
        log::warn!("Failed to close WebDriver session for '{phrase}': {e}");
    }

    let listings = dedupe_scraped(scraped?);
    log::info!(
        "Unique cards after duplicate removal for '{phrase}': {}",
        listings.len()
    );

    if listings.is_empty() {
        log::warn!("No data to save for '{phrase}'");
        return Ok(0);
    }

    let safe = normalize_phrase(phrase);
    let csv_path = csv_dir.join(format!(
        "{safe}{}",
        photocard_dataset::paths::SCRAPED_CSV_SUFFIX
    ));
    photocard_dataset::csv::write_listings(&csv_path, &listings)?;
    log::info!("CSV saved: {}", csv_path.display());

    let http = images::build_client()?;
    images::download_all(&http, &listings, &images_root.join(&safe)).await?;

    Ok(listings.len())
}

/// Opens a headless-Chrome WebDriver session.
async fn connect(webdriver_url: &str) -> Result<Client, ScrapeError> {
    let mut caps = serde_json::Map::new();
    caps.insert(
        "goog:chromeOptions".to_owned(),
        serde_json::json!({
            "args": [
                "--headless=new",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                format!("user-agent={USER_AGENT}"),
            ],
        }),
    );

    let mut builder = ClientBuilder::rustls().map_err(|e| ScrapeError::Tls(e.to_string()))?;
    builder.capabilities(caps);
    Ok(builder.connect(webdriver_url).await?)
}

/// Scrapes every price band in sequence, accumulating raw (undeduplicated)
/// listings.
async fn collect_bands(client: &Client, phrase: &str) -> Result<Vec<Listing>, ScrapeError> {
    let mut listings = Vec::new();
    for band in &PRICE_BANDS {
        listings.extend(scrape_band(client, phrase, band).await?);
    }
    Ok(listings)
}

async fn scrape_band(
    client: &Client,
    phrase: &str,
    band: &PriceBand,
) -> Result<Vec<Listing>, ScrapeError> {
    let url = band.search_url(phrase);
    log::info!("Opening price band {} yen: {url}", band.label());
    client.goto(&url).await?;

    if let Err(e) = client
        .wait()
        .at_most(RESULTS_TIMEOUT)
        .for_element(Locator::Css(ITEM_CELL))
        .await
    {
        log::warn!("No item cards for price band {}: {e}", band.label());
        return Ok(Vec::new());
    }

    scroll_to_end(client).await?;

    let items = client.find_all(Locator::Css(ITEM_CELL)).await?;
    log::info!("[Price band {}] Found {} cards", band.label(), items.len());

    let mut listings = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match parse_item(client, item).await {
            Ok(listing) => listings.push(listing),
            Err(e) => log::error!(
                "Error parsing card #{} at price band {}: {e}",
                idx + 1,
                band.label()
            ),
        }
    }

    Ok(listings)
}

/// Scrolls to the bottom until two consecutive page heights are equal,
/// signaling that no further lazy-loaded content is coming.
async fn scroll_to_end(client: &Client) -> Result<(), ScrapeError> {
    let mut last_height = body_scroll_height(client).await?;
    loop {
        client
            .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await?;
        tokio::time::sleep(SCROLL_SETTLE).await;

        let new_height = body_scroll_height(client).await?;
        if new_height == last_height {
            break;
        }
        last_height = new_height;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
async fn body_scroll_height(client: &Client) -> Result<i64, ScrapeError> {
    let value = client
        .execute("return document.body.scrollHeight;", vec![])
        .await?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|h| h.round() as i64))
        .ok_or_else(|| ScrapeError::Parse(format!("scrollHeight is not a number: {value}")))
}

/// Parses a single item cell into a [`Listing`].
async fn parse_item(client: &Client, item: &Element) -> Result<Listing, ScrapeError> {
    client
        .execute(
            "arguments[0].scrollIntoView();",
            vec![serde_json::to_value(item)?],
        )
        .await?;
    tokio::time::sleep(ITEM_SETTLE).await;

    let link = item.find(Locator::Css(THUMBNAIL_LINK)).await?;
    let href = link
        .attr("href")
        .await?
        .ok_or_else(|| ScrapeError::Parse("thumbnail link has no href".to_owned()))?;
    let product_url = absolutize_product_url(&href);

    let thumbnail = link.find(Locator::Css(THUMBNAIL_IMAGE)).await?;
    let aria_label = thumbnail.attr("aria-label").await?;
    let title = title_from_aria(aria_label.as_deref());

    let price = item
        .find(Locator::Css(PRICE_SPAN))
        .await?
        .text()
        .await?
        .trim()
        .to_owned();

    let image_url = item
        .find(Locator::Css("img"))
        .await?
        .attr("src")
        .await?
        .ok_or_else(|| ScrapeError::Parse("item image has no src".to_owned()))?;

    Ok(Listing {
        title,
        price,
        image_url,
        product_url,
    })
}

/// Extracts the listing title from the thumbnail `aria-label`.
///
/// Mercari labels thumbnails `<title>の画像`; everything before the marker
/// is the title. Cards without a label get a fixed placeholder.
fn title_from_aria(aria_label: Option<&str>) -> String {
    aria_label.map_or_else(
        || "No title".to_owned(),
        |label| label.split("の画像").next().unwrap_or(label).to_owned(),
    )
}

/// Prefixes relative product hrefs with the Mercari origin.
fn absolutize_product_url(href: &str) -> String {
    if href.starts_with("https") {
        href.to_owned()
    } else {
        format!("{BASE_URL}{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_ascending_and_non_overlapping() {
        for window in PRICE_BANDS.windows(2) {
            let upper = window[0].max.expect("only the last band is unbounded");
            assert_eq!(window[1].min, upper + 1);
        }
        assert!(PRICE_BANDS[5].max.is_none());
    }

    #[test]
    fn search_url_encodes_keyword_and_bounds() {
        let band = PriceBand {
            min: 300,
            max: Some(800),
        };
        let url = band.search_url("ジミン フォトカード");
        assert!(url.starts_with("https://www.mercari.com/jp/search/?keyword=%E3%82%B8"));
        assert!(url.ends_with("&price_min=300&price_max=800"));
    }

    #[test]
    fn search_url_omits_price_max_for_open_band() {
        let band = PriceBand {
            min: 40_001,
            max: None,
        };
        let url = band.search_url("card");
        assert!(url.ends_with("?keyword=card&price_min=40001"));
    }

    #[test]
    fn title_is_text_before_image_marker() {
        assert_eq!(
            title_from_aria(Some("BTS ジミン トレカの画像")),
            "BTS ジミン トレカ"
        );
        assert_eq!(title_from_aria(Some("no marker here")), "no marker here");
        assert_eq!(title_from_aria(None), "No title");
    }

    #[test]
    fn relative_product_urls_are_absolutized() {
        assert_eq!(
            absolutize_product_url("/jp/items/m123"),
            "https://www.mercari.com/jp/items/m123"
        );
        assert_eq!(
            absolutize_product_url("https://www.mercari.com/jp/items/m123"),
            "https://www.mercari.com/jp/items/m123"
        );
    }
}
