//! Quality scoring
//!
//! Every violation instance deducts the weight attached to its rule from a
//! starting score of 100. Repeated violations compound; the result is clamped
//! to `[0, 100]`.

use crate::{config::ScoreWeights, models::Violation};

/// Starting score of a clean artifact
pub const MAX_SCORE: u32 = 100;

/// Computes quality scores from violation lists
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    /// Creates a scorer with the given weights
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Total deduction for `violations`
    pub fn deduction(&self, violations: &[Violation]) -> u64 {
        violations
            .iter()
            .map(|v| u64::from(self.weights.weight(v.rule_id)))
            .sum()
    }

    /// Score in `[0, 100]`
    pub fn score(&self, violations: &[Violation]) -> u32 {
        let deduction = self.deduction(violations).min(u64::from(MAX_SCORE));
        MAX_SCORE - deduction as u32
    }
}
