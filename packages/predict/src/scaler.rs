//! Fitted price scaler.
//!
//! Training standardizes log-prices before fitting the head; at inference
//! we invert that transform. The scaler file carries the fitted `mean`
//! and `scale` arrays (one element each — prices are the only target).

use std::path::Path;

use serde::Deserialize;

use crate::PredictError;

#[derive(Deserialize)]
struct ScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// A fitted standard scaler over a single target column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScaler {
    mean: f64,
    scale: f64,
}

impl PriceScaler {
    /// Creates a scaler from its fitted parameters.
    #[must_use]
    pub const fn new(mean: f64, scale: f64) -> Self {
        Self { mean, scale }
    }

    /// Loads the scaler from its JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if the file cannot be read or holds no
    /// fitted parameters.
    pub fn load(path: &Path) -> Result<Self, PredictError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ScalerFile = serde_json::from_str(&raw)?;

        match (file.mean.first(), file.scale.first()) {
            (Some(&mean), Some(&scale)) => Ok(Self::new(mean, scale)),
            _ => Err(PredictError::Weights {
                message: format!("scaler file {} holds no fitted parameters", path.display()),
            }),
        }
    }

    /// Maps a standardized value back to the original (log-price) space.
    #[must_use]
    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_transform_undoes_standardization() {
        let scaler = PriceScaler::new(7.2, 1.4);
        let standardized = (9.0 - 7.2) / 1.4;
        assert!((scaler.inverse_transform(standardized) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn loads_fitted_parameters_from_json() {
        let dir = std::env::temp_dir().join("photocard_predict_scaler");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("price_scaler.json");
        std::fs::write(&path, r#"{"mean": [6.9], "scale": [1.1]}"#).unwrap();

        let scaler = PriceScaler::load(&path).unwrap();
        assert_eq!(scaler, PriceScaler::new(6.9, 1.1));
    }

    #[test]
    fn rejects_empty_parameter_arrays() {
        let dir = std::env::temp_dir().join("photocard_predict_scaler_empty");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("price_scaler.json");
        std::fs::write(&path, r#"{"mean": [], "scale": []}"#).unwrap();

        assert!(matches!(
            PriceScaler::load(&path),
            Err(PredictError::Weights { .. })
        ));
    }
}
