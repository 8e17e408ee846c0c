pub mod features;
pub mod inference;
pub mod predictor;
pub mod ranking;
pub mod scoring;
pub mod soil;

pub use features::engineer;
pub use predictor::{CropPredictor, PredictorConfig};
pub use ranking::Ranker;
pub use scoring::{BackendPreference, RuleBasedScorer, TrainedBackend};
pub use soil::SoilClassifier;
