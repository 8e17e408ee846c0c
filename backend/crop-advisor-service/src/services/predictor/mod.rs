/// Crop Predictor
///
/// Entry point for crop recommendations. The backend is decided once at
/// construction; trained artifacts are loaded on the first prediction and
/// kept for the life of the process. Every failure on the trained path
/// degrades to the rule-based scorer, so `predict` always returns a result.
use crate::error::Result;
use crate::models::{BackendKind, CandidateScore, FeatureVector, PredictionResult};
use crate::services::ranking::Ranker;
use crate::services::scoring::{
    backend_candidates, ArtifactPaths, BackendPreference, RuleBasedScorer, RuleOutcome,
    TrainedBackend, FALLBACK_CROPS,
};
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

type BackendLoader = fn(BackendKind, &ArtifactPaths) -> Result<TrainedBackend>;

/// Predictor settings
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Root holding `classifier/` and `deep/` artifact directories
    pub artifact_dir: PathBuf,
    pub backend: BackendPreference,
    /// Seed for the rule-based exploration and backfill randomness
    pub rng_seed: Option<u64>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("ml_models"),
            backend: BackendPreference::Auto,
            rng_seed: None,
        }
    }
}

pub struct CropPredictor {
    config: PredictorConfig,
    kind: BackendKind,
    /// Trained kinds tried in order on the first load
    candidates: Vec<BackendKind>,
    loader: BackendLoader,
    /// `Some(None)` once every load attempt failed
    trained: OnceCell<Option<TrainedBackend>>,
    rules: RuleBasedScorer,
    ranker: Ranker,
    rng: Mutex<StdRng>,
}

impl CropPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        let candidates = backend_candidates(config.backend, &config.artifact_dir);
        let kind = candidates.first().copied().unwrap_or(BackendKind::RuleBased);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            backend = %kind,
            artifact_dir = %config.artifact_dir.display(),
            seeded = config.rng_seed.is_some(),
            "Crop predictor configured"
        );

        Self {
            config,
            kind,
            candidates,
            loader: TrainedBackend::load,
            trained: OnceCell::new(),
            rules: RuleBasedScorer::new(),
            ranker: Ranker::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Predictor around an already loaded backend
    pub fn with_backend(backend: TrainedBackend, rng_seed: Option<u64>) -> Self {
        let predictor = Self::new(PredictorConfig {
            backend: BackendPreference::Fixed(backend.kind()),
            rng_seed,
            ..PredictorConfig::default()
        });
        // A fresh cell cannot already be set
        let _ = predictor.trained.set(Some(backend));
        predictor
    }

    /// Kind of the loaded trained backend, else the backend chosen at
    /// construction. Does not trigger the lazy load.
    pub fn backend_kind(&self) -> BackendKind {
        match self.trained.get() {
            Some(Some(backend)) => backend.kind(),
            _ => self.kind,
        }
    }

    /// Whether a trained backend is loaded and in use (triggers the lazy load)
    pub fn is_trained(&self) -> bool {
        self.trained_backend().is_some()
    }

    /// Labels the active backend can predict
    pub fn known_labels(&self) -> Vec<String> {
        match self.trained_backend() {
            Some(backend) => backend.labels().to_vec(),
            None => FALLBACK_CROPS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Predict the best crops for `features`
    pub fn predict(&self, features: &FeatureVector) -> PredictionResult {
        let (scores, backend) = match self.trained_backend() {
            Some(trained) => match trained.score(features) {
                Ok(scores) => (scores, trained.kind()),
                Err(e) => {
                    warn!(
                        backend = %trained.kind(),
                        error = %e,
                        "Trained scoring failed, using rule-based scorer for this call"
                    );
                    self.rule_scores(features)
                }
            },
            None => self.rule_scores(features),
        };

        let labels = self.known_labels();
        let pool: Vec<&str> = labels
            .iter()
            .map(String::as_str)
            .chain(FALLBACK_CROPS.iter().copied())
            .collect();

        let ranked = self.ranker.rank(scores, &pool, &mut *self.lock_rng());
        let top_3 = match ranked {
            Ok(ranked) => ranked,
            Err(e) => {
                // Unreachable while the pool holds every fallback crop
                warn!(error = %e, "Ranking failed, using exploration scores");
                self.exploration_fallback(features)
            }
        };

        let top = top_3[0].clone();
        debug!(
            backend = %backend,
            predicted = %top.label,
            confidence = top.score,
            "Crop prediction completed"
        );

        PredictionResult {
            predicted_label: top.label.clone(),
            confidence_score: top.score,
            confidence_percent: top.confidence_percent(),
            total_candidate_count: Some(labels.len()),
            all_candidate_labels: Some(labels),
            top_3,
            backend,
        }
    }

    fn trained_backend(&self) -> Option<&TrainedBackend> {
        self.trained
            .get_or_init(|| self.load_trained())
            .as_ref()
    }

    /// First candidate that loads cleanly
    fn load_trained(&self) -> Option<TrainedBackend> {
        for &kind in &self.candidates {
            let Some(paths) = ArtifactPaths::for_backend(&self.config.artifact_dir, kind) else {
                continue;
            };

            match (self.loader)(kind, &paths) {
                Ok(backend) => {
                    if kind != self.kind {
                        info!(
                            preferred = %self.kind,
                            backend = %kind,
                            "Preferred crop backend failed to load, using next available"
                        );
                    }
                    return Some(backend);
                }
                Err(e) => {
                    warn!(
                        backend = %kind,
                        error = %e,
                        "Failed to load trained crop backend"
                    );
                }
            }
        }

        if !self.candidates.is_empty() {
            warn!("No trained crop backend loaded, falling back to rule-based scoring");
        }
        None
    }

    fn rule_scores(&self, features: &FeatureVector) -> (Vec<CandidateScore>, BackendKind) {
        let (scores, outcome) = self.rules.score(features, &mut *self.lock_rng());
        if outcome == RuleOutcome::Exploration {
            debug!("Rule-based scorer used the exploration branch");
        }
        (scores, BackendKind::RuleBased)
    }

    fn exploration_fallback(&self, features: &FeatureVector) -> Vec<CandidateScore> {
        let mut rng = self.lock_rng();
        let (mut scores, _) = RuleBasedScorer::with_rules(Vec::new()).score(features, &mut *rng);
        scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        // The RNG holds no invariant a panicking holder could break
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inference::forest::{DecisionTree, TreeNode};
    use crate::services::inference::{InferenceModel, LabelEncoder, StandardScaler, TreeEnsemble};
    use crate::error::{PredictionError, Result};
    use crate::services::scoring::ArtifactBundle;
    use ndarray::ArrayD;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn rice_sample() -> FeatureVector {
        FeatureVector {
            nitrogen: 90.0,
            phosphorus: 42.0,
            potassium: 43.0,
            temperature: 21.0,
            humidity: 82.0,
            ph_value: 6.5,
            rainfall: 203.0,
        }
    }

    fn rule_based(seed: u64) -> CropPredictor {
        CropPredictor::new(PredictorConfig {
            backend: BackendPreference::Fixed(BackendKind::RuleBased),
            rng_seed: Some(seed),
            ..PredictorConfig::default()
        })
    }

    struct FailingModel;

    impl InferenceModel for FailingModel {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn infer(&self, _input: ArrayD<f32>) -> Result<Vec<f32>> {
            Err(PredictionError::InferenceError("boom".to_string()))
        }
    }

    fn bundle(model: Box<dyn InferenceModel>) -> ArtifactBundle {
        ArtifactBundle {
            scaler: StandardScaler {
                mean: vec![0.0; 7],
                scale: vec![1.0; 7],
            },
            encoder: LabelEncoder {
                classes: vec!["apple".into(), "banana".into(), "jute".into(), "lentil".into()],
            },
            model,
            metadata: None,
        }
    }

    fn constant_forest() -> TreeEnsemble {
        TreeEnsemble {
            n_features: 7,
            n_classes: 4,
            trees: vec![DecisionTree {
                nodes: vec![TreeNode::Leaf {
                    value: vec![1.0, 6.0, 2.0, 1.0],
                }],
            }],
        }
    }

    #[test]
    fn test_rule_based_rice() {
        let result = rule_based(1).predict(&rice_sample());

        assert_eq!(result.backend, BackendKind::RuleBased);
        assert_eq!(result.predicted_label, "Rice");
        assert!((result.confidence_score - 0.90).abs() < 1e-6);
        assert_eq!(result.top_3[1].label, "Maize");
        assert_eq!(result.top_3.len(), 3);
    }

    #[test]
    fn test_rule_based_labels() {
        let predictor = rule_based(1);
        assert!(!predictor.is_trained());
        assert_eq!(predictor.known_labels().len(), FALLBACK_CROPS.len());

        let result = predictor.predict(&FeatureVector::default());
        assert_eq!(result.total_candidate_count, Some(FALLBACK_CROPS.len()));
    }

    #[test]
    fn test_trained_backend_scores() {
        let backend = TrainedBackend::from_bundle(
            BackendKind::ClassicalClassifier,
            bundle(Box::new(constant_forest())),
        )
        .unwrap();
        let predictor = CropPredictor::with_backend(backend, Some(3));

        assert!(predictor.is_trained());
        let result = predictor.predict(&rice_sample());
        assert_eq!(result.backend, BackendKind::ClassicalClassifier);
        assert_eq!(result.predicted_label, "banana");
        assert!((result.confidence_score - 0.6).abs() < 1e-6);
        let labels: Vec<&str> = result.top_3.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["banana", "jute", "apple"]);
        assert_eq!(result.all_candidate_labels.unwrap().len(), 4);
    }

    #[test]
    fn test_scoring_failure_falls_back_per_call() {
        let backend = TrainedBackend::from_bundle(
            BackendKind::ClassicalClassifier,
            bundle(Box::new(FailingModel)),
        )
        .unwrap();
        let predictor = CropPredictor::with_backend(backend, Some(3));

        let result = predictor.predict(&rice_sample());
        assert_eq!(result.backend, BackendKind::RuleBased);
        assert_eq!(result.predicted_label, "Rice");
        // The trained backend stays loaded
        assert!(predictor.is_trained());
    }

    #[test]
    fn test_missing_artifacts_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = CropPredictor::new(PredictorConfig {
            artifact_dir: dir.path().to_path_buf(),
            backend: BackendPreference::Fixed(BackendKind::DeepModel),
            rng_seed: Some(5),
        });

        assert_eq!(predictor.backend_kind(), BackendKind::DeepModel);
        let result = predictor.predict(&FeatureVector::default());
        assert_eq!(result.backend, BackendKind::RuleBased);
        for candidate in &result.top_3 {
            assert!(FALLBACK_CROPS.contains(&candidate.label.as_str()));
        }
        assert!(!predictor.is_trained());
    }

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    fn counting_loader(kind: BackendKind, _paths: &ArtifactPaths) -> Result<TrainedBackend> {
        LOADS.fetch_add(1, AtomicOrdering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        TrainedBackend::from_bundle(kind, bundle(Box::new(constant_forest())))
    }

    #[test]
    fn test_concurrent_first_calls_load_once() {
        let mut predictor = CropPredictor::new(PredictorConfig {
            backend: BackendPreference::Fixed(BackendKind::ClassicalClassifier),
            rng_seed: Some(4),
            ..PredictorConfig::default()
        });
        predictor.loader = counting_loader;
        let predictor = Arc::new(predictor);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let predictor = predictor.clone();
                thread::spawn(move || predictor.predict(&rice_sample()))
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.backend, BackendKind::ClassicalClassifier);
            assert_eq!(result.predicted_label, "banana");
        }
        assert_eq!(LOADS.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_seeded_predictions_repeat() {
        let a = rule_based(21).predict(&FeatureVector::default());
        let b = rule_based(21).predict(&FeatureVector::default());
        assert_eq!(a.top_3, b.top_3);
    }
}
