/// Dense Network Runtime
///
/// Multi-layer perceptron exported layer by layer to JSON
/// (Dense 256 -> 128 -> 64 -> softmax in the crop model). Dropout layers are
/// inference no-ops and are not exported.
use super::{artifacts::load_json, softmax, InferenceModel};
use crate::error::{PredictionError, Result};
use ndarray::{Array1, Array2, ArrayD};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Linear,
    Softmax,
}

/// One fully connected layer, `weights` shaped `[inputs][units]` as Keras stores them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayerConfig {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseNetworkFile {
    layers: Vec<DenseLayerConfig>,
}

struct DenseLayer {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn load(path: &Path) -> Result<Self> {
        let config: DenseNetworkFile = load_json(path)?;
        Self::from_layers(config.layers)
    }

    pub fn from_layers(configs: Vec<DenseLayerConfig>) -> Result<Self> {
        if configs.is_empty() {
            return Err(PredictionError::ArtifactCorrupt(
                "dense network has no layers".to_string(),
            ));
        }

        let mut layers = Vec::with_capacity(configs.len());
        let mut prev_units: Option<usize> = None;

        for (i, config) in configs.into_iter().enumerate() {
            let inputs = config.weights.len();
            let units = config.bias.len();

            if let Some(prev) = prev_units {
                if prev != inputs {
                    return Err(PredictionError::IncompatibleShape {
                        expected: prev,
                        actual: inputs,
                    });
                }
            }

            if config.weights.iter().any(|w| w.len() != units) {
                return Err(PredictionError::ArtifactCorrupt(format!(
                    "layer {} weights do not match its {} units",
                    i, units
                )));
            }

            let flat: Vec<f32> = config.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((inputs, units), flat).map_err(|e| {
                PredictionError::ArtifactCorrupt(format!("layer {} weights: {}", i, e))
            })?;

            layers.push(DenseLayer {
                weights,
                bias: Array1::from(config.bias),
                activation: config.activation,
            });
            prev_units = Some(units);
        }

        Ok(Self { layers })
    }

    pub fn input_width(&self) -> usize {
        self.layers[0].weights.nrows()
    }

    pub fn output_width(&self) -> usize {
        self.layers[self.layers.len() - 1].bias.len()
    }

    pub fn forward(&self, row: &[f32]) -> Result<Vec<f32>> {
        if row.len() != self.input_width() {
            return Err(PredictionError::IncompatibleShape {
                expected: self.input_width(),
                actual: row.len(),
            });
        }

        let mut x = Array1::from(row.to_vec());
        for layer in &self.layers {
            let z = x.dot(&layer.weights) + &layer.bias;
            x = match layer.activation {
                Activation::Relu => z.mapv(|v| v.max(0.0)),
                Activation::Linear => z,
                Activation::Softmax => Array1::from(softmax(z.as_slice().unwrap_or(&[]))),
            };
        }

        Ok(x.to_vec())
    }
}

impl InferenceModel for DenseNetwork {
    fn name(&self) -> &'static str {
        "dense_network"
    }

    fn input_dim(&self) -> Option<usize> {
        Some(self.input_width())
    }

    fn infer(&self, input: ArrayD<f32>) -> Result<Vec<f32>> {
        let row: Vec<f32> = input.iter().copied().collect();
        self.forward(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer() -> DenseNetwork {
        DenseNetwork::from_layers(vec![
            DenseLayerConfig {
                weights: vec![vec![1.0, -1.0], vec![0.5, 0.5]],
                bias: vec![0.0, 0.0],
                activation: Activation::Relu,
            },
            DenseLayerConfig {
                weights: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
                bias: vec![0.0, 0.0, 0.0],
                activation: Activation::Softmax,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_forward_softmax_output() {
        let net = two_layer();
        assert_eq!(net.input_width(), 2);
        assert_eq!(net.output_width(), 3);

        // hidden = relu([2 + 1, -2 + 1]) = [3, 0]
        let out = net.forward(&[2.0, 2.0]).unwrap();
        let sum: f32 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(out[0] > out[1]);
        assert!((out[1] - out[2]).abs() < 1e-6);
    }

    #[test]
    fn test_layer_width_mismatch() {
        let result = DenseNetwork::from_layers(vec![
            DenseLayerConfig {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0, 0.0],
                activation: Activation::Relu,
            },
            DenseLayerConfig {
                weights: vec![vec![1.0], vec![1.0], vec![1.0]],
                bias: vec![0.0],
                activation: Activation::Linear,
            },
        ]);
        assert!(matches!(
            result,
            Err(PredictionError::IncompatibleShape {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_ragged_weights_rejected() {
        let result = DenseNetwork::from_layers(vec![DenseLayerConfig {
            weights: vec![vec![1.0, 1.0], vec![1.0]],
            bias: vec![0.0, 0.0],
            activation: Activation::Linear,
        }]);
        assert!(matches!(result, Err(PredictionError::ArtifactCorrupt(_))));
    }

    #[test]
    fn test_wrong_input_width() {
        let err = two_layer().forward(&[1.0; 15]).unwrap_err();
        assert!(matches!(err, PredictionError::IncompatibleShape { .. }));
    }
}
