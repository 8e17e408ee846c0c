use crate::error::{PredictionError, Result};
use crate::models::{SoilClassification, SoilType};
use crate::services::inference::{argmax, to_distribution, InferenceModel, OnnxModel};
use image::DynamicImage;
use ndarray::Array4;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Square input edge of the soil CNN
pub const INPUT_SIZE: u32 = 224;

/// ImageNet channel statistics the CNN was trained with
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Soil type classifier over photos
pub struct SoilClassifier {
    model_path: Option<PathBuf>,
    model: OnceCell<Option<Arc<dyn InferenceModel>>>,
}

impl SoilClassifier {
    /// Classifier whose ONNX model is loaded on first use
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            model: OnceCell::new(),
        }
    }

    /// Classifier around an already loaded model
    pub fn with_model(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model_path: None,
            model: OnceCell::with_value(Some(model)),
        }
    }

    /// Whether a model is loaded (triggers the lazy load)
    pub fn is_available(&self) -> bool {
        self.model().is_some()
    }

    /// Classify the soil in an encoded image
    pub fn classify(&self, image_bytes: &[u8]) -> Result<SoilClassification> {
        if image_bytes.is_empty() {
            return Err(PredictionError::InvalidImage("empty image".to_string()));
        }

        let img = image::load_from_memory(image_bytes)
            .map_err(|e| PredictionError::InvalidImage(e.to_string()))?;

        let model = self.model().ok_or_else(|| {
            PredictionError::ModelUnavailable("soil classification model is not loaded".to_string())
        })?;

        let input = preprocess_image(&img);
        let raw = model.infer(input.into_dyn())?;
        if raw.len() != SoilType::ALL.len() {
            return Err(PredictionError::IncompatibleShape {
                expected: SoilType::ALL.len(),
                actual: raw.len(),
            });
        }

        let probabilities = to_distribution(&raw);
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(PredictionError::InferenceError(
                "soil model produced non-finite probabilities".to_string(),
            ));
        }
        let best = argmax(&probabilities)
            .ok_or_else(|| PredictionError::InferenceError("empty model output".to_string()))?;
        let soil_type = SoilType::ALL[best];

        debug!(
            soil_type = soil_type.as_str(),
            confidence = probabilities[best],
            "Soil image classified"
        );

        Ok(SoilClassification {
            soil_type,
            display_name: soil_type.display_name().to_string(),
            confidence_score: probabilities[best],
            all_predictions: SoilType::ALL
                .iter()
                .zip(probabilities.iter())
                .map(|(soil, p)| (soil.as_str().to_string(), *p))
                .collect(),
        })
    }

    fn model(&self) -> Option<&Arc<dyn InferenceModel>> {
        self.model.get_or_init(|| self.load_model()).as_ref()
    }

    fn load_model(&self) -> Option<Arc<dyn InferenceModel>> {
        let path = self.model_path.as_ref()?;
        let shape = [1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];

        match OnnxModel::load(path, &shape) {
            Ok(model) => {
                info!(path = %path.display(), "Soil classification model loaded");
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Soil classification model unavailable"
                );
                None
            }
        }
    }
}

/// Resize, convert to RGB and normalize into an NCHW `[1, 3, 224, 224]` tensor
pub fn preprocess_image(img: &DynamicImage) -> Array4<f32> {
    let resized = img.resize_exact(
        INPUT_SIZE,
        INPUT_SIZE,
        image::imageops::FilterType::Lanczos3,
    );
    let rgb = resized.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }

    tensor
}
