//! Listing image downloader.
//!
//! Images are fetched synchronously (one request at a time) after the CSV
//! is written, named by the 1-based row position within that CSV so the
//! merge stage can pair them back up by position. Failures are logged and
//! skipped; there are no retries.

use std::path::Path;
use std::time::Duration;

use photocard_models::Listing;

use crate::ScrapeError;

/// Per-request timeout for image downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Extension used when the image URL carries none.
const DEFAULT_EXTENSION: &str = "jpg";

/// Builds the HTTP client used for image downloads.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the client cannot be constructed.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()
}

/// Downloads every listing's image into `image_dir`.
///
/// File names are `<row>.<ext>` with 1-based row positions matching the
/// listing order. Individual download failures are logged and skipped.
/// Returns the number of images actually written.
///
/// # Errors
///
/// Returns [`ScrapeError`] only if the image directory cannot be created.
pub async fn download_all(
    client: &reqwest::Client,
    listings: &[Listing],
    image_dir: &Path,
) -> Result<usize, ScrapeError> {
    photocard_dataset::paths::ensure_dir(image_dir)?;

    let mut downloaded = 0;
    for (idx, listing) in listings.iter().enumerate() {
        match download_one(client, &listing.image_url, image_dir, idx + 1).await {
            Ok(()) => downloaded += 1,
            Err(e) => log::error!("Error downloading image {}: {e}", listing.image_url),
        }
    }

    log::info!(
        "Image download complete ({downloaded}/{} succeeded). Folder: {}",
        listings.len(),
        image_dir.display()
    );
    Ok(downloaded)
}

async fn download_one(
    client: &reqwest::Client,
    url: &str,
    image_dir: &Path,
    row: usize,
) -> Result<(), ScrapeError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ScrapeError::ImageStatus {
            status: response.status(),
        });
    }

    let bytes = response.bytes().await?;
    let path = image_dir.join(format!("{row}.{}", image_extension(url)));
    std::fs::write(path, &bytes)?;
    Ok(())
}

/// Infers the image file extension from the URL path, ignoring any query
/// string or fragment. Defaults to `jpg`.
#[must_use]
pub fn image_extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => DEFAULT_EXTENSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_url_path() {
        assert_eq!(
            image_extension("https://static.mercdn.net/item/detail/orig/photos/m123_1.jpg"),
            "jpg"
        );
        assert_eq!(
            image_extension("https://static.mercdn.net/thumb/photos/m9.webp?w=240"),
            "webp"
        );
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(image_extension("https://static.mercdn.net/photos/m9"), "jpg");
        assert_eq!(
            image_extension("https://static.mercdn.net/photos/.hidden"),
            "jpg"
        );
    }
}
