/// ONNX Model Runtime
///
/// Loads ONNX exports (Keras via tf2onnx, sklearn via skl2onnx, the soil CNN)
/// and runs them with tract-onnx.
use super::InferenceModel;
use crate::error::{PredictionError, Result};
use ndarray::ArrayD;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::debug;

/// Type alias for the optimized tract model
type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxModel {
    plan: TractModel,
    input_shape: Vec<usize>,
}

impl OnnxModel {
    /// Load and optimize an ONNX model for a fixed input shape
    pub fn load(path: &Path, input_shape: &[usize]) -> Result<Self> {
        if !path.exists() {
            return Err(PredictionError::ArtifactMissing(path.display().to_string()));
        }

        let plan = Self::load_tract_model(path, input_shape).map_err(|e| {
            PredictionError::ArtifactCorrupt(format!("{}: {}", path.display(), e))
        })?;

        debug!(
            path = %path.display(),
            input_shape = ?input_shape,
            "ONNX model loaded"
        );

        Ok(Self {
            plan,
            input_shape: input_shape.to_vec(),
        })
    }

    fn load_tract_model(path: &Path, input_shape: &[usize]) -> anyhow::Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, f32::fact(input_shape.to_vec()).into())?
            .into_optimized()?
            .into_runnable()?;

        Ok(model)
    }
}

impl InferenceModel for OnnxModel {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn input_dim(&self) -> Option<usize> {
        self.input_shape.last().copied()
    }

    fn infer(&self, input: ArrayD<f32>) -> Result<Vec<f32>> {
        if input.shape() != self.input_shape.as_slice() {
            let expected: usize = self.input_shape.iter().product();
            return Err(PredictionError::IncompatibleShape {
                expected,
                actual: input.len(),
            });
        }

        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(&self.input_shape, &data)
            .map_err(|e| PredictionError::InferenceError(format!("Input tensor: {}", e)))?;

        let outputs = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(|e| PredictionError::InferenceError(format!("ONNX inference failed: {}", e)))?;

        // skl2onnx exports emit the label tensor first; take the first f32 output
        for output in outputs.iter() {
            if let Ok(view) = output.to_array_view::<f32>() {
                return Ok(view.iter().copied().collect());
            }
        }

        Err(PredictionError::InferenceError(
            "Model produced no f32 output tensor".to_string(),
        ))
    }
}
