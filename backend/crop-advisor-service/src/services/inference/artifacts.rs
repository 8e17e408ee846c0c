/// Preprocessing Artifacts
///
/// JSON exports of the fitted scaler, the label encoder and the training
/// metadata written next to each model.
use crate::error::{PredictionError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Read and deserialize a JSON artifact
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(PredictionError::ArtifactMissing(path.display().to_string()));
    }

    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        PredictionError::ArtifactCorrupt(format!("{}: {}", path.display(), e))
    })
}

/// Standardization fitted at training time: `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self> {
        let scaler: Self = load_json(path)?;
        if scaler.mean.len() != scaler.scale.len() {
            return Err(PredictionError::ArtifactCorrupt(format!(
                "{}: mean has {} entries, scale has {}",
                path.display(),
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }
        Ok(scaler)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f32]) -> Result<Vec<f32>> {
        if row.len() != self.n_features() {
            return Err(PredictionError::IncompatibleShape {
                expected: self.n_features(),
                actual: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| {
                // Zero-variance columns are left unscaled
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// Maps model output indices to crop labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn load(path: &Path) -> Result<Self> {
        let encoder: Self = load_json(path)?;
        if encoder.classes.is_empty() {
            return Err(PredictionError::ArtifactCorrupt(format!(
                "{}: label encoder has no classes",
                path.display()
            )));
        }
        Ok(encoder)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

/// Training metadata written alongside the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub training_date: Option<String>,
    pub num_features: usize,
    pub num_classes: usize,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub test_accuracy: Option<f32>,
    #[serde(default)]
    pub test_top3_accuracy: Option<f32>,
}

impl ModelMetadata {
    /// Optional artifact: `Ok(None)` when the file is absent
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        match load_json(path) {
            Ok(meta) => Ok(Some(meta)),
            Err(PredictionError::ArtifactMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check the metadata against the loaded scaler and encoder
    pub fn validate(&self, scaler: &StandardScaler, encoder: &LabelEncoder) -> Result<()> {
        if self.num_features != scaler.n_features() {
            return Err(PredictionError::IncompatibleShape {
                expected: self.num_features,
                actual: scaler.n_features(),
            });
        }
        if self.num_classes != encoder.len() {
            return Err(PredictionError::IncompatibleShape {
                expected: self.num_classes,
                actual: encoder.len(),
            });
        }
        Ok(())
    }
}
