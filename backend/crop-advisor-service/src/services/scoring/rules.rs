// ============================================
// Rule-Based Scorer
// ============================================
//
// Threshold rules over the raw measurements. Used when no trained
// backend is available and as the per-call fallback when one fails.
//
// Two branches:
// 1. Matched: every rule whose full condition holds scores its crop
// 2. Exploration: no rule fired, three random crops get a low score

use crate::models::{CandidateScore, FeatureVector};
use crate::utils::{clamp_unit, round2};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Crops known to the rule-based backend and used for backfill
pub const FALLBACK_CROPS: [&str; 22] = [
    "Rice",
    "Wheat",
    "Maize",
    "Cotton",
    "Sugarcane",
    "Pulses",
    "Millets",
    "Soybean",
    "Groundnut",
    "Sunflower",
    "Chickpea",
    "Kidney Beans",
    "Pigeon Peas",
    "Banana",
    "Mango",
    "Grapes",
    "Orange",
    "Papaya",
    "Coconut",
    "Pomegranate",
    "Apple",
    "Coffee",
];

/// Exploration scores are whole hundredths in [0.60, 0.80)
const EXPLORATION_HUNDREDTHS: std::ops::Range<u32> = 60..80;

/// Number of crops scored by the exploration branch
const EXPLORATION_COUNT: usize = 3;

/// Which branch produced the scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Matched,
    Exploration,
}

/// A conjunctive threshold rule
#[derive(Clone)]
pub struct ScoringRule {
    pub label: &'static str,
    pub score: f32,
    /// Half-width of a uniform jitter around `score`
    pub jitter: f32,
    pub condition: fn(&FeatureVector) -> bool,
}

impl ScoringRule {
    pub fn matches(&self, features: &FeatureVector) -> bool {
        (self.condition)(features)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.jitter <= 0.0 {
            return self.score;
        }
        let offset = rng.gen_range(-self.jitter..=self.jitter);
        round2(clamp_unit(self.score + offset))
    }
}

impl std::fmt::Debug for ScoringRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringRule")
            .field("label", &self.label)
            .field("score", &self.score)
            .field("jitter", &self.jitter)
            .finish()
    }
}

fn default_rules() -> Vec<ScoringRule> {
    vec![
        ScoringRule {
            label: "Rice",
            score: 0.90,
            jitter: 0.0,
            condition: |f| f.rainfall > 150.0 && f.humidity > 70.0,
        },
        ScoringRule {
            label: "Wheat",
            score: 0.85,
            jitter: 0.0,
            condition: |f| {
                f.temperature > 15.0
                    && f.temperature < 25.0
                    && f.rainfall > 50.0
                    && f.rainfall < 100.0
            },
        },
        ScoringRule {
            label: "Cotton",
            score: 0.82,
            jitter: 0.0,
            condition: |f| f.potassium > 100.0 && f.temperature > 25.0,
        },
        ScoringRule {
            label: "Sugarcane",
            score: 0.88,
            jitter: 0.0,
            condition: |f| f.nitrogen > 90.0 && f.rainfall > 120.0,
        },
        ScoringRule {
            label: "Pulses",
            score: 0.80,
            jitter: 0.0,
            condition: |f| f.nitrogen > 40.0 && f.nitrogen < 80.0 && f.rainfall < 80.0,
        },
        ScoringRule {
            label: "Maize",
            score: 0.83,
            jitter: 0.0,
            condition: |f| {
                f.nitrogen > 60.0
                    && f.nitrogen < 100.0
                    && f.phosphorus > 40.0
                    && f.phosphorus < 80.0
            },
        },
    ]
}

/// Rule-based scorer
#[derive(Debug, Clone)]
pub struct RuleBasedScorer {
    rules: Vec<ScoringRule>,
}

impl Default for RuleBasedScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedScorer {
    /// Scorer with the built-in crop rules
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Scorer with custom rules
    pub fn with_rules(rules: Vec<ScoringRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    /// Score `features`; fired rules keep evaluation order
    pub fn score<R: Rng + ?Sized>(
        &self,
        features: &FeatureVector,
        rng: &mut R,
    ) -> (Vec<CandidateScore>, RuleOutcome) {
        let matched: Vec<CandidateScore> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(features))
            .map(|rule| CandidateScore::new(rule.label, rule.draw(rng)))
            .collect();

        if !matched.is_empty() {
            debug!(
                matched = matched.len(),
                top = %matched[0].label,
                "Crop rules fired"
            );
            return (matched, RuleOutcome::Matched);
        }

        let explored: Vec<CandidateScore> = FALLBACK_CROPS
            .choose_multiple(rng, EXPLORATION_COUNT)
            .map(|label| {
                let hundredths = rng.gen_range(EXPLORATION_HUNDREDTHS);
                CandidateScore::new(*label, hundredths as f32 / 100.0)
            })
            .collect();

        debug!("No crop rule fired, exploring {} random crops", explored.len());
        (explored, RuleOutcome::Exploration)
    }
}
