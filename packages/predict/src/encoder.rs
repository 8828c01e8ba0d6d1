//! CLIP encoder client.
//!
//! The encoder runs as a sidecar inference service exposing text and image
//! embedding endpoints for a fixed public model. Images travel as base64
//! JSON payloads; both endpoints answer `{"embedding": [..]}`. The model
//! is frozen — this client only ever reads embeddings out of it.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use crate::PredictError;

/// The pretrained multimodal encoder used for every embedding.
pub const CLIP_MODEL: &str = "openai/clip-vit-base-patch32";

/// Environment variable naming the encoder service endpoint.
pub const CLIP_BASE_URL_ENV: &str = "CLIP_BASE_URL";

/// Returns the encoder service URL from `CLIP_BASE_URL`, defaulting to a
/// local sidecar.
#[must_use]
pub fn clip_base_url_from_env() -> String {
    std::env::var(CLIP_BASE_URL_ENV).unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Trait for computing embeddings.
///
/// All four model inputs (one image, three texts) go through the same
/// encoder; the trait keeps the [`Predictor`](crate::Predictor) testable
/// without a running inference service.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Embeds one text string.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if the request or response parsing fails.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, PredictError>;

    /// Embeds one image from its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if the request or response parsing fails.
    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>, PredictError>;
}

/// HTTP client for the CLIP embedding service.
pub struct ClipEncoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl ClipEncoder {
    /// Creates a client for the encoder service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, PredictError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn post_embedding(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<Vec<f32>, PredictError> {
        let url = format!("{}/v1/embeddings/{endpoint}", self.base_url);
        let response = self.client.post(&url).json(payload).send().await?;

        if !response.status().is_success() {
            return Err(PredictError::Encoder {
                message: format!("{url} returned status {}", response.status()),
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(PredictError::Encoder {
                message: format!("{url} returned an empty embedding"),
            });
        }
        Ok(body.embedding)
    }
}

#[async_trait]
impl Encoder for ClipEncoder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, PredictError> {
        self.post_embedding(
            "text",
            &serde_json::json!({ "model": CLIP_MODEL, "text": text }),
        )
        .await
    }

    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>, PredictError> {
        self.post_embedding(
            "image",
            &serde_json::json!({ "model": CLIP_MODEL, "image": BASE64.encode(image) }),
        )
        .await
    }
}
