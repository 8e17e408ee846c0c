use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of raw soil/climate measurements
pub const RAW_FEATURE_COUNT: usize = 7;

/// Number of entries in the engineered representation
pub const ENGINEERED_FEATURE_COUNT: usize = 15;

/// Names of the engineered features, in vector order
pub const FEATURE_NAMES: [&str; ENGINEERED_FEATURE_COUNT] = [
    "N",
    "P",
    "K",
    "temperature",
    "humidity",
    "ph",
    "rainfall",
    "NPK_sum",
    "N_P_ratio",
    "N_K_ratio",
    "P_K_ratio",
    "temp_humidity",
    "rainfall_humidity",
    "temp_cat_encoded",
    "rain_cat_encoded",
];

/// Raw soil and climate measurements. Missing keys deserialize to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureVector {
    pub nitrogen: f32,
    pub phosphorus: f32,
    pub potassium: f32,
    pub temperature: f32,
    pub humidity: f32,
    pub ph_value: f32,
    pub rainfall: f32,
}

impl FeatureVector {
    /// Layout: [N, P, K, temperature, humidity, ph, rainfall]
    pub fn to_array(&self) -> [f32; RAW_FEATURE_COUNT] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph_value,
            self.rainfall,
        ]
    }
}

/// 15-value derived representation consumed by the deep model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineeredVector(pub [f32; ENGINEERED_FEATURE_COUNT]);

impl EngineeredVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn raw(&self) -> &[f32] {
        &self.0[..RAW_FEATURE_COUNT]
    }

    pub fn npk_sum(&self) -> f32 {
        self.0[7]
    }

    pub fn n_p_ratio(&self) -> f32 {
        self.0[8]
    }

    pub fn n_k_ratio(&self) -> f32 {
        self.0[9]
    }

    pub fn p_k_ratio(&self) -> f32 {
        self.0[10]
    }

    pub fn temp_humidity(&self) -> f32 {
        self.0[11]
    }

    pub fn rainfall_humidity(&self) -> f32 {
        self.0[12]
    }

    pub fn temp_category(&self) -> u8 {
        self.0[13] as u8
    }

    pub fn rain_category(&self) -> u8 {
        self.0[14] as u8
    }
}

/// A scored candidate label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub label: String,
    pub score: f32,
}

impl CandidateScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    pub fn confidence_percent(&self) -> f32 {
        self.score * 100.0
    }
}

/// Candidate as rendered in API responses
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub crop: String,
    pub score: f32,
    pub confidence_percent: f32,
}

impl From<&CandidateScore> for RankedCandidate {
    fn from(candidate: &CandidateScore) -> Self {
        Self {
            crop: candidate.label.clone(),
            score: candidate.score,
            confidence_percent: candidate.confidence_percent(),
        }
    }
}

/// Backend that produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    RuleBased,
    ClassicalClassifier,
    DeepModel,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::RuleBased => "rule_based",
            BackendKind::ClassicalClassifier => "classical_classifier",
            BackendKind::DeepModel => "deep_model",
        }
    }

    /// Artifact subdirectory for trained backends
    pub fn artifact_dir_name(&self) -> Option<&'static str> {
        match self {
            BackendKind::RuleBased => None,
            BackendKind::ClassicalClassifier => Some("classifier"),
            BackendKind::DeepModel => Some("deep"),
        }
    }

    /// Length of the vector fed to the scaler
    pub fn input_dim(&self) -> usize {
        match self {
            BackendKind::DeepModel => ENGINEERED_FEATURE_COUNT,
            _ => RAW_FEATURE_COUNT,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a crop prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub predicted_label: String,
    pub confidence_score: f32,
    pub confidence_percent: f32,
    pub top_3: Vec<CandidateScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_candidate_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_candidate_labels: Option<Vec<String>>,
    pub backend: BackendKind,
}

impl PredictionResult {
    pub fn top_3_candidates(&self) -> Vec<RankedCandidate> {
        self.top_3.iter().map(RankedCandidate::from).collect()
    }
}

/// Soil classes recognised by the image classifier, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilType {
    Black,
    Clay,
    Loamy,
    Sandy,
}

impl SoilType {
    pub const ALL: [SoilType; 4] = [
        SoilType::Black,
        SoilType::Clay,
        SoilType::Loamy,
        SoilType::Sandy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Black => "black",
            SoilType::Clay => "clay",
            SoilType::Loamy => "loamy",
            SoilType::Sandy => "sandy",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SoilType::Black => "Black Soil",
            SoilType::Clay => "Clay Soil",
            SoilType::Loamy => "Loamy Soil",
            SoilType::Sandy => "Sandy Soil",
        }
    }
}

/// Result of a soil image classification
#[derive(Debug, Clone, Serialize)]
pub struct SoilClassification {
    pub soil_type: SoilType,
    pub display_name: String,
    pub confidence_score: f32,
    pub all_predictions: BTreeMap<String, f32>,
}
