//! The regression head mapping concatenated embeddings to a scalar
//! log-price.
//!
//! Architecture (fixed): Linear → BatchNorm → ReLU → Linear → BatchNorm →
//! ReLU → Linear, with dropout disabled at inference. BatchNorm in eval
//! mode is a per-feature affine transform over the stored running
//! statistics, so the whole head is plain `Vec<f32>` arithmetic.
//!
//! Weights load from a JSON state dict keyed PyTorch-style
//! (`net.0.weight`, `net.1.running_mean`, …); checkpoints saved from a
//! distributed run carry a `module.` key prefix which is stripped at load.

use std::collections::HashMap;
use std::path::Path;

use crate::PredictError;

/// BatchNorm epsilon, matching the training framework's default.
const BN_EPSILON: f32 = 1e-5;

/// Key prefix written by distributed-training checkpoints.
const DISTRIBUTED_PREFIX: &str = "module.";

/// A fully connected layer.
struct Linear {
    /// `weight[out][in]`.
    weight: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl Linear {
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weight
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                row.iter()
                    .zip(input)
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
                    + bias
            })
            .collect()
    }

    fn in_features(&self) -> usize {
        self.weight.first().map_or(0, Vec::len)
    }

    fn out_features(&self) -> usize {
        self.weight.len()
    }
}

/// BatchNorm1d in eval mode: normalize by the running statistics, then
/// apply the learned affine transform.
struct BatchNorm {
    gamma: Vec<f32>,
    beta: Vec<f32>,
    running_mean: Vec<f32>,
    running_var: Vec<f32>,
}

impl BatchNorm {
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        input
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let normalized = (x - self.running_mean[i]) / (self.running_var[i] + BN_EPSILON).sqrt();
                normalized * self.gamma[i] + self.beta[i]
            })
            .collect()
    }

    fn features(&self) -> usize {
        self.gamma.len()
    }
}

fn relu(input: &mut [f32]) {
    for x in input {
        *x = x.max(0.0);
    }
}

/// The feed-forward regression head.
pub struct Regressor {
    fc1: Linear,
    bn1: BatchNorm,
    fc2: Linear,
    bn2: BatchNorm,
    out: Linear,
}

impl Regressor {
    /// Loads the head from a JSON state-dict file.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if the file cannot be read or the state
    /// dict is malformed.
    pub fn load(path: &Path) -> Result<Self, PredictError> {
        let raw = std::fs::read_to_string(path)?;
        let dict: HashMap<String, serde_json::Value> = serde_json::from_str(&raw)?;
        Self::from_state_dict(dict)
    }

    /// Builds the head from a parsed state dict, stripping the optional
    /// `module.` distributed-training prefix from every key.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::Weights`] if a tensor is missing, has the
    /// wrong shape, or layer dimensions disagree.
    pub fn from_state_dict(
        dict: HashMap<String, serde_json::Value>,
    ) -> Result<Self, PredictError> {
        let dict: HashMap<String, serde_json::Value> = dict
            .into_iter()
            .map(|(key, value)| {
                let key = key
                    .strip_prefix(DISTRIBUTED_PREFIX)
                    .map_or(key.as_str(), |stripped| stripped)
                    .to_owned();
                (key, value)
            })
            .collect();

        let head = Self {
            fc1: linear(&dict, "net.0")?,
            bn1: batch_norm(&dict, "net.1")?,
            fc2: linear(&dict, "net.4")?,
            bn2: batch_norm(&dict, "net.5")?,
            out: linear(&dict, "net.8")?,
        };
        head.check_shapes()?;
        Ok(head)
    }

    /// Number of input features the head expects (the concatenated
    /// embedding width).
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.fc1.in_features()
    }

    /// Runs the forward pass, producing the scalar log-price in the
    /// scaler's space.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::Shape`] if `features` does not match the
    /// head's input width.
    pub fn forward(&self, features: &[f32]) -> Result<f32, PredictError> {
        if features.len() != self.input_dim() {
            return Err(PredictError::Shape {
                message: format!(
                    "expected {} features, got {}",
                    self.input_dim(),
                    features.len()
                ),
            });
        }

        let mut hidden = self.bn1.forward(&self.fc1.forward(features));
        relu(&mut hidden);
        let mut hidden = self.bn2.forward(&self.fc2.forward(&hidden));
        relu(&mut hidden);
        let output = self.out.forward(&hidden);

        output.first().copied().ok_or_else(|| PredictError::Shape {
            message: "output layer produced no value".to_string(),
        })
    }

    fn check_shapes(&self) -> Result<(), PredictError> {
        let checks = [
            (self.fc1.out_features(), self.bn1.features(), "net.0/net.1"),
            (self.bn1.features(), self.fc2.in_features(), "net.1/net.4"),
            (self.fc2.out_features(), self.bn2.features(), "net.4/net.5"),
            (self.bn2.features(), self.out.in_features(), "net.5/net.8"),
        ];
        for (left, right, layers) in checks {
            if left != right {
                return Err(PredictError::Weights {
                    message: format!("dimension mismatch between {layers}: {left} vs {right}"),
                });
            }
        }
        if self.out.out_features() != 1 {
            return Err(PredictError::Weights {
                message: format!(
                    "output layer must produce 1 value, produces {}",
                    self.out.out_features()
                ),
            });
        }
        Ok(())
    }
}

fn linear(dict: &HashMap<String, serde_json::Value>, layer: &str) -> Result<Linear, PredictError> {
    let weight = matrix(dict, &format!("{layer}.weight"))?;
    let bias = vector(dict, &format!("{layer}.bias"))?;
    if weight.len() != bias.len() {
        return Err(PredictError::Weights {
            message: format!(
                "{layer}: weight rows ({}) disagree with bias length ({})",
                weight.len(),
                bias.len()
            ),
        });
    }
    Ok(Linear { weight, bias })
}

fn batch_norm(
    dict: &HashMap<String, serde_json::Value>,
    layer: &str,
) -> Result<BatchNorm, PredictError> {
    let norm = BatchNorm {
        gamma: vector(dict, &format!("{layer}.weight"))?,
        beta: vector(dict, &format!("{layer}.bias"))?,
        running_mean: vector(dict, &format!("{layer}.running_mean"))?,
        running_var: vector(dict, &format!("{layer}.running_var"))?,
    };
    let features = norm.features();
    if norm.beta.len() != features
        || norm.running_mean.len() != features
        || norm.running_var.len() != features
    {
        return Err(PredictError::Weights {
            message: format!("{layer}: batch norm tensors have inconsistent lengths"),
        });
    }
    Ok(norm)
}

fn vector(dict: &HashMap<String, serde_json::Value>, key: &str) -> Result<Vec<f32>, PredictError> {
    let value = dict.get(key).ok_or_else(|| PredictError::Weights {
        message: format!("missing tensor '{key}'"),
    })?;
    serde_json::from_value(value.clone()).map_err(|e| PredictError::Weights {
        message: format!("tensor '{key}' is not a 1-D float array: {e}"),
    })
}

fn matrix(
    dict: &HashMap<String, serde_json::Value>,
    key: &str,
) -> Result<Vec<Vec<f32>>, PredictError> {
    let value = dict.get(key).ok_or_else(|| PredictError::Weights {
        message: format!("missing tensor '{key}'"),
    })?;
    let rows: Vec<Vec<f32>> =
        serde_json::from_value(value.clone()).map_err(|e| PredictError::Weights {
            message: format!("tensor '{key}' is not a 2-D float array: {e}"),
        })?;
    let width = rows.first().map_or(0, Vec::len);
    if width == 0 || rows.iter().any(|row| row.len() != width) {
        return Err(PredictError::Weights {
            message: format!("tensor '{key}' rows have inconsistent widths"),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2→2→2→1 state dict with identity linears and unit batch norms.
    fn tiny_state_dict(prefix: &str) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        let mut put = |key: &str, value: serde_json::Value| {
            dict.insert(format!("{prefix}{key}"), value);
        };

        put("net.0.weight", serde_json::json!([[1.0, 0.0], [0.0, 1.0]]));
        put("net.0.bias", serde_json::json!([0.0, 0.0]));
        put("net.1.weight", serde_json::json!([1.0, 1.0]));
        put("net.1.bias", serde_json::json!([0.0, 0.0]));
        put("net.1.running_mean", serde_json::json!([0.0, 0.0]));
        put("net.1.running_var", serde_json::json!([1.0, 1.0]));
        put("net.4.weight", serde_json::json!([[1.0, 0.0], [0.0, 1.0]]));
        put("net.4.bias", serde_json::json!([0.0, 0.0]));
        put("net.5.weight", serde_json::json!([1.0, 1.0]));
        put("net.5.bias", serde_json::json!([0.0, 0.0]));
        put("net.5.running_mean", serde_json::json!([0.0, 0.0]));
        put("net.5.running_var", serde_json::json!([1.0, 1.0]));
        put("net.8.weight", serde_json::json!([[1.0, 1.0]]));
        put("net.8.bias", serde_json::json!([0.5]));
        dict
    }

    #[test]
    fn forward_computes_the_expected_scalar() {
        let head = Regressor::from_state_dict(tiny_state_dict("")).unwrap();
        // Identity layers and unit norms: output ≈ sum(relu(x)) + 0.5.
        let output = head.forward(&[2.0, 3.0]).unwrap();
        assert!((output - 5.5).abs() < 1e-3, "got {output}");
    }

    #[test]
    fn relu_zeroes_negative_activations() {
        let head = Regressor::from_state_dict(tiny_state_dict("")).unwrap();
        let output = head.forward(&[-4.0, 1.0]).unwrap();
        assert!((output - 1.5).abs() < 1e-3, "got {output}");
    }

    #[test]
    fn distributed_prefix_is_stripped() {
        let head = Regressor::from_state_dict(tiny_state_dict("module.")).unwrap();
        assert_eq!(head.input_dim(), 2);
        let output = head.forward(&[1.0, 1.0]).unwrap();
        assert!((output - 2.5).abs() < 1e-3, "got {output}");
    }

    #[test]
    fn rejects_wrong_feature_width() {
        let head = Regressor::from_state_dict(tiny_state_dict("")).unwrap();
        assert!(matches!(
            head.forward(&[1.0, 2.0, 3.0]),
            Err(PredictError::Shape { .. })
        ));
    }

    #[test]
    fn rejects_missing_tensor() {
        let mut dict = tiny_state_dict("");
        dict.remove("net.5.running_var");
        assert!(matches!(
            Regressor::from_state_dict(dict),
            Err(PredictError::Weights { .. })
        ));
    }

    #[test]
    fn rejects_mismatched_layer_dims() {
        let mut dict = tiny_state_dict("");
        dict.insert("net.8.weight".to_owned(), serde_json::json!([[1.0, 1.0, 1.0]]));
        assert!(matches!(
            Regressor::from_state_dict(dict),
            Err(PredictError::Weights { .. })
        ));
    }
}
