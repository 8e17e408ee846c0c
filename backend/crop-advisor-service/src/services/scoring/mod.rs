/// Scoring Module
///
/// Produces a score per candidate crop from a feature vector.
///
/// # Backends
/// - **RuleBased**: fixed threshold rules with a random exploration branch
/// - **ClassicalClassifier**: scaler + tree ensemble (or ONNX) over the raw 7 features
/// - **DeepModel**: scaler + MLP (or ONNX) over the engineered 15 features
///
/// The trained backends share one artifact layout:
/// `<artifact_dir>/<classifier|deep>/{scaler.json, label_encoder.json, model.onnx|model.json}`
/// plus an optional `metadata.json`.
pub mod rules;

pub use crate::models::BackendKind;
pub use rules::{RuleBasedScorer, RuleOutcome, ScoringRule, FALLBACK_CROPS};

use crate::error::{PredictionError, Result};
use crate::models::{CandidateScore, FeatureVector};
use crate::services::features::engineer;
use crate::services::inference::{
    row_tensor, to_distribution, DenseNetwork, InferenceModel, LabelEncoder, ModelMetadata,
    OnnxModel, StandardScaler, TreeEnsemble,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

const SCALER_FILE: &str = "scaler.json";
const ENCODER_FILE: &str = "label_encoder.json";
const METADATA_FILE: &str = "metadata.json";
const MODEL_FILES: [&str; 2] = ["model.onnx", "model.json"];

/// Backend requested through configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPreference {
    /// Best trained backend whose artifacts exist, else rule-based
    Auto,
    Fixed(BackendKind),
}

impl FromStr for BackendPreference {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(BackendPreference::Auto),
            "rule_based" | "rules" | "mock" => Ok(BackendPreference::Fixed(BackendKind::RuleBased)),
            "classifier" | "classical_classifier" => {
                Ok(BackendPreference::Fixed(BackendKind::ClassicalClassifier))
            }
            "deep" | "deep_model" => Ok(BackendPreference::Fixed(BackendKind::DeepModel)),
            other => Err(PredictionError::InvalidInput(format!(
                "unknown crop backend '{}'",
                other
            ))),
        }
    }
}

/// File locations of one trained backend
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub scaler: PathBuf,
    pub encoder: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    /// `None` for the rule-based backend, which has no artifacts
    pub fn for_backend(artifact_root: &Path, kind: BackendKind) -> Option<Self> {
        let dir = artifact_root.join(kind.artifact_dir_name()?);
        Some(Self {
            scaler: dir.join(SCALER_FILE),
            encoder: dir.join(ENCODER_FILE),
            metadata: dir.join(METADATA_FILE),
            dir,
        })
    }

    /// First model file present, ONNX preferred
    pub fn model(&self) -> Option<PathBuf> {
        MODEL_FILES
            .iter()
            .map(|name| self.dir.join(name))
            .find(|p| p.exists())
    }

    /// All three required artifacts exist
    pub fn probe(&self) -> bool {
        self.scaler.exists() && self.encoder.exists() && self.model().is_some()
    }
}

/// Trained backends worth a load attempt, in priority order.
///
/// `Auto` lists every trained kind whose artifacts exist, deep model first.
/// A fixed trained kind is listed even without artifacts so its load failure
/// gets logged.
pub fn backend_candidates(
    preference: BackendPreference,
    artifact_root: &Path,
) -> Vec<BackendKind> {
    match preference {
        BackendPreference::Fixed(BackendKind::RuleBased) => Vec::new(),
        BackendPreference::Fixed(kind) => vec![kind],
        BackendPreference::Auto => [BackendKind::DeepModel, BackendKind::ClassicalClassifier]
            .into_iter()
            .filter(|kind| {
                ArtifactPaths::for_backend(artifact_root, *kind)
                    .map(|paths| paths.probe())
                    .unwrap_or(false)
            })
            .collect(),
    }
}

/// Pick the backend once, from configuration and artifact availability
pub fn resolve_backend(preference: BackendPreference, artifact_root: &Path) -> BackendKind {
    backend_candidates(preference, artifact_root)
        .first()
        .copied()
        .unwrap_or(BackendKind::RuleBased)
}

/// Everything loaded from one backend directory
pub struct ArtifactBundle {
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
    pub model: Box<dyn InferenceModel>,
    pub metadata: Option<ModelMetadata>,
}

/// A loaded trained backend. Read-only after load.
pub struct TrainedBackend {
    kind: BackendKind,
    bundle: ArtifactBundle,
}

impl TrainedBackend {
    /// Load all artifacts of `kind` from `paths`
    pub fn load(kind: BackendKind, paths: &ArtifactPaths) -> Result<Self> {
        let scaler = StandardScaler::load(&paths.scaler)?;
        let encoder = LabelEncoder::load(&paths.encoder)?;
        let metadata = ModelMetadata::load_optional(&paths.metadata)?;

        let model_path = paths.model().ok_or_else(|| {
            PredictionError::ArtifactMissing(paths.dir.join(MODEL_FILES[0]).display().to_string())
        })?;
        let model = Self::load_model(kind, &model_path)?;

        if let Some(meta) = &metadata {
            meta.validate(&scaler, &encoder)?;
        }

        let backend = Self::from_bundle(
            kind,
            ArtifactBundle {
                scaler,
                encoder,
                model,
                metadata,
            },
        )?;

        info!(
            backend = %kind,
            model = backend.bundle.model.name(),
            classes = backend.bundle.encoder.len(),
            version = backend
                .metadata()
                .and_then(|m| m.model_version.as_deref())
                .unwrap_or("unknown"),
            "Trained crop backend loaded from {}",
            paths.dir.display()
        );

        Ok(backend)
    }

    fn load_model(kind: BackendKind, path: &Path) -> Result<Box<dyn InferenceModel>> {
        let is_onnx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false);

        if is_onnx {
            return Ok(Box::new(OnnxModel::load(path, &[1, kind.input_dim()])?));
        }

        match kind {
            BackendKind::ClassicalClassifier => Ok(Box::new(TreeEnsemble::load(path)?)),
            BackendKind::DeepModel => Ok(Box::new(DenseNetwork::load(path)?)),
            BackendKind::RuleBased => Err(PredictionError::InvalidInput(
                "rule-based backend has no model artifact".to_string(),
            )),
        }
    }

    /// Assemble a backend from already loaded artifacts, checking that they fit together
    pub fn from_bundle(kind: BackendKind, bundle: ArtifactBundle) -> Result<Self> {
        if kind == BackendKind::RuleBased {
            return Err(PredictionError::InvalidInput(
                "rule-based backend has no trained artifacts".to_string(),
            ));
        }

        let expected = kind.input_dim();
        if bundle.scaler.n_features() != expected {
            return Err(PredictionError::IncompatibleShape {
                expected,
                actual: bundle.scaler.n_features(),
            });
        }
        if let Some(dim) = bundle.model.input_dim() {
            if dim != expected {
                return Err(PredictionError::IncompatibleShape {
                    expected,
                    actual: dim,
                });
            }
        }

        Ok(Self { kind, bundle })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn labels(&self) -> &[String] {
        self.bundle.encoder.classes()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.bundle.metadata.as_ref()
    }

    /// Probability for every known label, in encoder order
    pub fn score(&self, features: &FeatureVector) -> Result<Vec<CandidateScore>> {
        let row: Vec<f32> = match self.kind {
            BackendKind::DeepModel => engineer(features).as_slice().to_vec(),
            _ => features.to_array().to_vec(),
        };

        let scaled = self.bundle.scaler.transform(&row)?;
        let raw = self.bundle.model.infer(row_tensor(&scaled)?)?;

        if raw.len() != self.bundle.encoder.len() {
            return Err(PredictionError::IncompatibleShape {
                expected: self.bundle.encoder.len(),
                actual: raw.len(),
            });
        }

        let probabilities = to_distribution(&raw);
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(PredictionError::InferenceError(
                "model produced non-finite scores".to_string(),
            ));
        }

        debug!(
            backend = %self.kind,
            classes = probabilities.len(),
            "Trained backend scored candidates"
        );

        Ok(self
            .labels()
            .iter()
            .zip(probabilities)
            .map(|(label, p)| CandidateScore::new(label.clone(), p))
            .collect())
    }
}
