// ============================================
// Ranker
// ============================================
//
// Turns any number of scored candidates into exactly three:
// 1. Drop non-finite scores, keep the best score per label
// 2. Stable sort descending (equal scores keep insertion order)
// 3. Keep the top three
// 4. Backfill from the candidate pool with strictly lower scores

use crate::error::{PredictionError, Result};
use crate::models::CandidateScore;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Number of candidates in every ranked result
pub const TOP_K: usize = 3;

/// Backfill scores never start above this ceiling
const BACKFILL_CEILING: f32 = 0.7;

/// Backfill multiplier applied to `min(lowest, BACKFILL_CEILING)`
const BACKFILL_DECAY: std::ops::Range<f32> = 0.72..1.0;

/// Score band for the first backfill when nothing was scored
const EMPTY_BACKFILL_BAND: std::ops::Range<f32> = 0.5..0.7;

#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    k: usize,
}

impl Default for Ranker {
    fn default() -> Self {
        Self { k: TOP_K }
    }
}

impl Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank `scores` and backfill from `pool` up to exactly three entries.
    ///
    /// Backfilled entries score strictly below the lowest ranked score,
    /// except when that score is 0.0: backfills then tie it at 0.0.
    pub fn rank<R, S>(
        &self,
        scores: Vec<CandidateScore>,
        pool: &[S],
        rng: &mut R,
    ) -> Result<Vec<CandidateScore>>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        let scored_count = scores.len();
        let mut ranked = Self::dedupe(scores);

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(self.k);

        if ranked.len() < self.k {
            self.backfill(&mut ranked, pool, rng)?;
        }

        debug!(
            scored = scored_count,
            top = %ranked[0].label,
            "Candidates ranked"
        );

        Ok(ranked)
    }

    /// First occurrence of each label, raised to that label's best score
    fn dedupe(scores: Vec<CandidateScore>) -> Vec<CandidateScore> {
        let mut unique: Vec<CandidateScore> = Vec::with_capacity(scores.len());
        for candidate in scores.into_iter().filter(|c| c.score.is_finite()) {
            match unique.iter_mut().find(|c| c.label == candidate.label) {
                Some(existing) if candidate.score > existing.score => {
                    existing.score = candidate.score;
                }
                Some(_) => {}
                None => unique.push(candidate),
            }
        }
        unique
    }

    fn backfill<R, S>(
        &self,
        ranked: &mut Vec<CandidateScore>,
        pool: &[S],
        rng: &mut R,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        let mut taken: HashSet<String> = ranked.iter().map(|c| c.label.clone()).collect();
        let mut extras: Vec<&str> = pool
            .iter()
            .map(|label| label.as_ref())
            .filter(|label| taken.insert((*label).to_string()))
            .collect();

        let needed = self.k - ranked.len();
        if extras.len() < needed {
            return Err(PredictionError::CandidatePoolExhausted {
                needed: self.k,
                available: ranked.len() + extras.len(),
            });
        }

        extras.shuffle(rng);
        for label in extras.into_iter().take(needed) {
            let score = match ranked.last() {
                Some(lowest) => {
                    lowest.score.min(BACKFILL_CEILING) * rng.gen_range(BACKFILL_DECAY)
                }
                None => rng.gen_range(EMPTY_BACKFILL_BAND),
            };
            ranked.push(CandidateScore::new(label, score));
        }

        debug!(backfilled = needed, "Ranked candidates backfilled from pool");
        Ok(())
    }
}
