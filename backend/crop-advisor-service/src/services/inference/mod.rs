/// Inference Module
///
/// Model runtimes and preprocessing artifacts shared by the crop predictor
/// and the soil classifier.
///
/// # Runtimes
/// - **OnnxModel**: ONNX graphs executed with tract-onnx
/// - **TreeEnsemble**: JSON random forest (classical classifier)
/// - **DenseNetwork**: JSON multi-layer perceptron (deep model)
pub mod artifacts;
pub mod dense;
pub mod forest;
pub mod onnx;

pub use artifacts::{load_json, LabelEncoder, ModelMetadata, StandardScaler};
pub use dense::DenseNetwork;
pub use forest::TreeEnsemble;
pub use onnx::OnnxModel;

use crate::error::{PredictionError, Result};
use ndarray::{ArrayD, IxDyn};

/// Tolerance when checking that scores already sum to one
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// A loaded model that maps one input row to one row of class scores
pub trait InferenceModel: Send + Sync {
    /// Runtime name for diagnostics
    fn name(&self) -> &'static str;

    /// Width of the expected input row, if the runtime knows it
    fn input_dim(&self) -> Option<usize> {
        None
    }

    /// Run inference on a `(1, ...)` tensor
    fn infer(&self, input: ArrayD<f32>) -> Result<Vec<f32>>;
}

/// Wrap a single feature row as a `(1, n)` tensor
pub fn row_tensor(row: &[f32]) -> Result<ArrayD<f32>> {
    ArrayD::from_shape_vec(IxDyn(&[1, row.len()]), row.to_vec())
        .map_err(|e| PredictionError::InferenceError(format!("Failed to build input row: {}", e)))
}

/// Return `scores` unchanged if they already form a probability
/// distribution, otherwise apply softmax.
pub fn to_distribution(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let in_range = scores.iter().all(|s| (0.0..=1.0).contains(s));
    let sum: f32 = scores.iter().sum();
    if in_range && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE {
        return scores.to_vec();
    }

    softmax(scores)
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index of the largest score (first one wins on ties)
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
            Some((_, b)) if s <= b => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_passthrough() {
        let probs = vec![0.7, 0.2, 0.1];
        assert_eq!(to_distribution(&probs), probs);
    }

    #[test]
    fn test_logits_get_softmax() {
        let out = to_distribution(&[2.0, 1.0, 0.1]);
        let sum: f32 = out.iter().sum();

        assert!((sum - 1.0).abs() < 1e-5);
        assert!(out[0] > out[1] && out[1] > out[2]);
        assert!((out[0] - 0.659).abs() < 1e-3);
    }

    #[test]
    fn test_softmax_large_values() {
        let out = softmax(&[1000.0, 1000.0]);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!(out.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.6, 0.3]), Some(1));
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_row_tensor_shape() {
        let t = row_tensor(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.shape(), &[1, 3]);
    }
}
