//! Distance to score conversion
//!
//! ```text
//! base     = (1 - distance) * 100
//! weight   = clamp((len / 50)^0.8, 0.3, 1.0)     halved when no-relevant
//! adjusted = base * weight
//! scaled   = adjusted * 0.7 if base < 70         threshold cliff
//! scaled  *= 0.5 if len < 10
//! final    = clamp(scaled, 0, 100)
//! ```
//!
//! The cliff at `base = 70` is a deliberate step, not a smooth curve.

use shared_types::Relevance;

use crate::search::{ConfidenceTier, Query, RankedResult, SearchCandidate};

/// Input length at which the length weight saturates
pub const REFERENCE_INPUT_LENGTH: f32 = 50.0;
pub const LENGTH_WEIGHT_EXPONENT: f32 = 0.8;
pub const MIN_LENGTH_WEIGHT: f32 = 0.3;
pub const NO_RELEVANT_WEIGHT_FACTOR: f32 = 0.5;

/// Base scores below this get [`LOW_BASE_PENALTY`]
pub const PENALTY_THRESHOLD: f32 = 70.0;
pub const LOW_BASE_PENALTY: f32 = 0.7;
pub const EXTREMELY_SHORT_PENALTY: f32 = 0.5;

pub const MAX_RECOMMENDATIONS: usize = 5;
pub const MAX_NO_RELEVANT_RECOMMENDATIONS: usize = 2;

/// Turns candidate distances into bounded scores and confidence tiers
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAdjuster;

impl ScoreAdjuster {
    pub fn new() -> Self {
        Self
    }

    /// Weight in `[0.15, 1.0]` favouring longer inputs
    pub fn length_weight(input_length: usize, relevance: Relevance) -> f32 {
        let ratio = input_length as f32 / REFERENCE_INPUT_LENGTH;
        let weight = ratio
            .powf(LENGTH_WEIGHT_EXPONENT)
            .clamp(MIN_LENGTH_WEIGHT, 1.0);
        match relevance {
            Relevance::Relevant => weight,
            Relevance::NoRelevant => weight * NO_RELEVANT_WEIGHT_FACTOR,
        }
    }

    /// Final score in `[0, 100]` and its tier
    pub fn score(
        &self,
        distance: f32,
        query: &Query,
        relevance: Relevance,
    ) -> (f32, ConfidenceTier) {
        let base = (1.0 - distance) * 100.0;
        let adjusted = base * Self::length_weight(query.input_length, relevance);

        let mut scaled = if base < PENALTY_THRESHOLD {
            adjusted * LOW_BASE_PENALTY
        } else {
            adjusted
        };
        if query.is_extremely_short {
            scaled *= EXTREMELY_SHORT_PENALTY;
        }

        let final_score = if scaled.is_nan() {
            0.0
        } else {
            scaled.clamp(0.0, 100.0)
        };

        tracing::trace!(
            "distance {:.4} -> base {:.2}, adjusted {:.2}, final {:.2}",
            distance,
            base,
            adjusted,
            final_score
        );
        (final_score, ConfidenceTier::from(final_score))
    }

    /// Score, sort descending and cap the recommendation list
    ///
    /// Candidates are scored on their effective (boosted) distance. At most
    /// five results are kept, two when the input was judged not relevant.
    pub fn rank(
        &self,
        candidates: &[SearchCandidate],
        query: &Query,
        relevance: Relevance,
    ) -> Vec<RankedResult> {
        let mut results: Vec<RankedResult> = candidates
            .iter()
            .map(|candidate| {
                let (score, confidence) = self.score(candidate.distance, query, relevance);
                RankedResult {
                    template_id: candidate.template_id.clone(),
                    score,
                    confidence,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        let limit = match relevance {
            Relevance::Relevant => MAX_RECOMMENDATIONS,
            Relevance::NoRelevant => MAX_NO_RELEVANT_RECOMMENDATIONS,
        };
        results.truncate(limit);
        results
    }
}
