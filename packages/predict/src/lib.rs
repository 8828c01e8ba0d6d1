#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Photocard price prediction.
//!
//! One image and three text fields (title, member, group) are embedded by
//! the same frozen CLIP encoder, concatenated in fixed order, pushed
//! through the regression head, inverse-transformed by the fitted scaler
//! and exponentiated into a yen estimate.
//!
//! A [`Predictor`] is loaded once at process start and never mutated, so
//! concurrent read-only calls are safe without locking. There are no
//! retries; every failure propagates to the caller.

pub mod encoder;
pub mod regressor;
pub mod scaler;

use std::path::PathBuf;

pub use encoder::{CLIP_BASE_URL_ENV, CLIP_MODEL, ClipEncoder, Encoder, clip_base_url_from_env};
pub use regressor::Regressor;
pub use scaler::PriceScaler;

/// Environment variable overriding the regression head weight file.
pub const REGRESSOR_WEIGHTS_ENV: &str = "REGRESSOR_WEIGHTS";

/// Environment variable overriding the fitted scaler file.
pub const PRICE_SCALER_ENV: &str = "PRICE_SCALER";

/// Errors that can occur during prediction.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// An HTTP request to the encoder service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The encoder service answered with an unusable response.
    #[error("Encoder error: {message}")]
    Encoder {
        /// Description of what went wrong.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A model artifact is malformed.
    #[error("Weights error: {message}")]
    Weights {
        /// Description of what went wrong.
        message: String,
    },

    /// A tensor had an unexpected shape at inference time.
    #[error("Shape error: {message}")]
    Shape {
        /// Description of what went wrong.
        message: String,
    },
}

/// The process-wide prediction state: encoder client, regression head and
/// fitted scaler, loaded once and reused for every request.
pub struct Predictor {
    encoder: Box<dyn Encoder>,
    regressor: Regressor,
    scaler: PriceScaler,
}

impl Predictor {
    /// Assembles a predictor from already-loaded parts.
    #[must_use]
    pub fn new(encoder: Box<dyn Encoder>, regressor: Regressor, scaler: PriceScaler) -> Self {
        Self {
            encoder,
            regressor,
            scaler,
        }
    }

    /// Loads the predictor from the default artifact locations, overridable
    /// via `REGRESSOR_WEIGHTS`, `PRICE_SCALER` and `CLIP_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if an artifact is missing or malformed.
    pub fn load_default() -> Result<Self, PredictError> {
        let weights = env_path(REGRESSOR_WEIGHTS_ENV)
            .unwrap_or_else(photocard_dataset::paths::regressor_weights_path);
        let scaler = env_path(PRICE_SCALER_ENV)
            .unwrap_or_else(photocard_dataset::paths::price_scaler_path);

        log::info!(
            "Loading regression head from {} and scaler from {}",
            weights.display(),
            scaler.display()
        );

        Ok(Self::new(
            Box::new(ClipEncoder::new(&clip_base_url_from_env())?),
            Regressor::load(&weights)?,
            PriceScaler::load(&scaler)?,
        ))
    }

    /// Predicts a price in yen for one photocard.
    ///
    /// Embeds the image and the three texts with the frozen encoder,
    /// concatenates the vectors in fixed order `{image, title, member,
    /// group}`, runs the regression head, inverts the scaler and
    /// exponentiates.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if any embedding call or the forward pass
    /// fails. Nothing is retried.
    pub async fn predict(
        &self,
        image: &[u8],
        title: &str,
        member: &str,
        group: &str,
    ) -> Result<f64, PredictError> {
        let image_emb = self.encoder.embed_image(image).await?;
        let title_emb = self.encoder.embed_text(title).await?;
        let member_emb = self.encoder.embed_text(member).await?;
        let group_emb = self.encoder.embed_text(group).await?;

        let features: Vec<f32> = [image_emb, title_emb, member_emb, group_emb].concat();
        let log_scaled = self.regressor.forward(&features)?;
        let log_price = self.scaler.inverse_transform(f64::from(log_scaled));
        Ok(log_price.exp())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Encoder stub returning distinct one-element embeddings per input,
    /// so concatenation order is observable in the feature vector.
    struct StubEncoder;

    #[async_trait]
    impl Encoder for StubEncoder {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>, PredictError> {
            Ok(vec![match text {
                "title" => 2.0,
                "member" => 3.0,
                "group" => 4.0,
                _ => 0.0,
            }])
        }

        async fn embed_image(&self, _image: &[u8]) -> Result<Vec<f32>, PredictError> {
            Ok(vec![1.0])
        }
    }

    /// 4→1 head that passes the weighted feature sum straight through:
    /// one hidden unit, identity norms, positive activations.
    fn passthrough_head() -> Regressor {
        let mut dict = HashMap::new();
        let mut put = |key: &str, value: serde_json::Value| {
            dict.insert(key.to_owned(), value);
        };
        put("net.0.weight", serde_json::json!([[1.0, 10.0, 100.0, 1000.0]]));
        put("net.0.bias", serde_json::json!([0.0]));
        put("net.1.weight", serde_json::json!([1.0]));
        put("net.1.bias", serde_json::json!([0.0]));
        put("net.1.running_mean", serde_json::json!([0.0]));
        put("net.1.running_var", serde_json::json!([1.0]));
        put("net.4.weight", serde_json::json!([[1.0]]));
        put("net.4.bias", serde_json::json!([0.0]));
        put("net.5.weight", serde_json::json!([1.0]));
        put("net.5.bias", serde_json::json!([0.0]));
        put("net.5.running_mean", serde_json::json!([0.0]));
        put("net.5.running_var", serde_json::json!([1.0]));
        put("net.8.weight", serde_json::json!([[1.0]]));
        put("net.8.bias", serde_json::json!([0.0]));
        Regressor::from_state_dict(dict).unwrap()
    }

    #[tokio::test]
    async fn price_is_exp_of_inverse_transformed_head_output() {
        let scaler = PriceScaler::new(5.0, 0.001);
        let predictor = Predictor::new(Box::new(StubEncoder), passthrough_head(), scaler);

        let price = predictor
            .predict(b"img", "title", "member", "group")
            .await
            .unwrap();

        // Features are [1, 2, 3, 4] in {image, title, member, group}
        // order, so the head output L is 1 + 20 + 300 + 4000 = 4321 (up
        // to batch-norm epsilon) and the price must equal
        // exp(inverse_transform(L)).
        let head_output = f64::from(passthrough_head().forward(&[1.0, 2.0, 3.0, 4.0]).unwrap());
        let expected = scaler.inverse_transform(head_output).exp();
        assert!((price - expected).abs() < 1e-9, "got {price}, want {expected}");
        assert!(price > 0.0);
    }

    #[tokio::test]
    async fn encoder_failures_propagate() {
        struct FailingEncoder;

        #[async_trait]
        impl Encoder for FailingEncoder {
            async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, PredictError> {
                Err(PredictError::Encoder {
                    message: "stub".to_string(),
                })
            }

            async fn embed_image(&self, _image: &[u8]) -> Result<Vec<f32>, PredictError> {
                Err(PredictError::Encoder {
                    message: "stub".to_string(),
                })
            }
        }

        let predictor = Predictor::new(
            Box::new(FailingEncoder),
            passthrough_head(),
            PriceScaler::new(0.0, 1.0),
        );
        assert!(predictor.predict(b"img", "t", "m", "g").await.is_err());
    }
}
