//! Google translate client.
//!
//! Uses the free `translate_a/single` endpoint (the same one the
//! `deep-translator` ecosystem wraps): a GET with the text in the query
//! string, answered by a nested JSON array whose first element holds the
//! translated segments.

use std::time::Duration;

use async_trait::async_trait;

use crate::TranslateError;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Per-request timeout for translation calls.
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(15);

/// Trait for translating a single listing title.
///
/// The pipeline only ever needs one text at a time; batching, caching and
/// fan-out live in [`crate::pipeline`], so implementations stay a thin
/// wrapper over one network call.
#[async_trait]
pub trait TitleTranslator: Send + Sync {
    /// Translates `text` from the source to the target language.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError`] if the request or response parsing fails.
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

/// Client for the public Google translate endpoint.
pub struct GoogleTranslator {
    client: reqwest::Client,
    source: String,
    target: String,
}

impl GoogleTranslator {
    /// Creates a translator for the given language pair (ISO 639-1 codes).
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError`] if the HTTP client cannot be built.
    pub fn new(source: &str, target: &str) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(TRANSLATE_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            source: source.to_owned(),
            target: target.to_owned(),
        })
    }

    /// Creates the Japanese-to-English translator used by the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError`] if the HTTP client cannot be built.
    pub fn ja_to_en() -> Result<Self, TranslateError> {
        Self::new("ja", "en")
    }
}

#[async_trait]
impl TitleTranslator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source.as_str()),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslateError::Parse {
                message: format!("translate endpoint returned status {}", response.status()),
            });
        }

        let body: serde_json::Value = response.json().await?;
        parse_response(&body)
    }
}

/// Parses the nested-array response: element 0 is a list of segments, each
/// segment's element 0 is a translated chunk; chunks concatenate to the
/// full translation.
fn parse_response(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| TranslateError::Parse {
            message: "translate response missing segments array".to_string(),
        })?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(serde_json::Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Parse {
            message: "translate response contained no text".to_string(),
        });
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_segment() {
        let body = serde_json::json!([
            [["Jimin photocard", "ジミン フォトカード", null, null, 10]],
            null,
            "ja"
        ]);
        assert_eq!(parse_response(&body).unwrap(), "Jimin photocard");
    }

    #[test]
    fn concatenates_multiple_segments() {
        let body = serde_json::json!([
            [
                ["BTS Jimin ", "BTS ジミン ", null, null],
                ["photocard set", "トレカ セット", null, null]
            ],
            null,
            "ja"
        ]);
        assert_eq!(parse_response(&body).unwrap(), "BTS Jimin photocard set");
    }

    #[test]
    fn rejects_empty_response() {
        assert!(parse_response(&serde_json::json!([[], null, "ja"])).is_err());
        assert!(parse_response(&serde_json::json!({"error": 400})).is_err());
    }
}
