use serde::{Deserialize, Serialize};

use crate::model::{BlockProgress, Difficulty, PerDifficulty};

//
// ─── WEIGHTS ───────────────────────────────────────────────────────────────────
//

pub const EASY_WEIGHT: f64 = 0.20;
pub const MEDIUM_WEIGHT: f64 = 0.40;
pub const HARD_WEIGHT: f64 = 0.40;

/// Contribution of a tier to the weighted mastery score.
#[must_use]
pub fn difficulty_weight(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => EASY_WEIGHT,
        Difficulty::Medium => MEDIUM_WEIGHT,
        Difficulty::Hard => HARD_WEIGHT,
    }
}

//
// ─── BREAKDOWN ─────────────────────────────────────────────────────────────────
//

/// Result of a mastery computation.
///
/// `accuracy_by_difficulty` is `None` for tiers with no attempts; those tiers
/// are left out of the weighted sum rather than counted as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryBreakdown {
    pub mastery: f64,
    pub accuracy_by_difficulty: PerDifficulty<Option<f64>>,
    pub total_attempted: u32,
    pub total_correct: u32,
}

/// Weighted mastery from raw per-tier counters.
///
/// `Σ(accuracy_d × weight_d) / Σ(weight_d for attempted tiers)`, or `0.0`
/// when nothing has been attempted. Renormalising over attempted tiers means a
/// learner with only easy answers, all correct, scores `1.0`.
#[must_use]
pub fn calculate_mastery(
    attempted: &PerDifficulty<u32>,
    correct: &PerDifficulty<u32>,
) -> MasteryBreakdown {
    let accuracy_by_difficulty = attempted.map(|difficulty, &tries| {
        (tries > 0).then(|| (f64::from(correct[difficulty]) / f64::from(tries)).min(1.0))
    });

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (difficulty, accuracy) in accuracy_by_difficulty.iter() {
        if let Some(accuracy) = accuracy {
            let weight = difficulty_weight(difficulty);
            weighted_sum += accuracy * weight;
            weight_total += weight;
        }
    }

    let mastery = if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    MasteryBreakdown {
        mastery,
        accuracy_by_difficulty,
        total_attempted: attempted.total(),
        total_correct: correct.total(),
    }
}

/// Mastery breakdown for a block's current counters.
#[must_use]
pub fn calculate_block_mastery(progress: &BlockProgress) -> MasteryBreakdown {
    calculate_mastery(progress.questions_attempted(), progress.questions_correct())
}

/// Count one answer against `difficulty` and recompute the block's mastery.
///
/// Completion state is carried over untouched; deciding completion is the
/// job of `completion::check_block_completion`.
#[must_use]
pub fn update_mastery_after_answer(
    progress: &BlockProgress,
    difficulty: Difficulty,
    is_correct: bool,
) -> BlockProgress {
    let mut next = progress.clone();
    next.questions_attempted[difficulty] = next.questions_attempted[difficulty].saturating_add(1);
    if is_correct {
        next.questions_correct[difficulty] = next.questions_correct[difficulty].saturating_add(1);
    }
    next.mastery_score = calculate_block_mastery(&next).mastery;
    next
}

/// Accumulate an externally scored delta: `clamp(previous + delta, 0, 1)`.
#[must_use]
pub fn apply_mastery_delta(previous: f64, delta: f64) -> f64 {
    let next = previous + delta;
    if next.is_nan() {
        return previous.clamp(0.0, 1.0);
    }
    next.clamp(0.0, 1.0)
}

//
// ─── SCALE CONVERSIONS ─────────────────────────────────────────────────────────
//

/// Decimal mastery (`0..=1`) to percent (`0..=100`).
///
/// Mastery is stored and passed around in decimal form only; call this once,
/// at the presentation boundary.
#[must_use]
pub fn mastery_to_percent(mastery: f64) -> f64 {
    mastery * 100.0
}

/// Percent (`0..=100`) back to decimal mastery.
#[must_use]
pub fn percent_to_mastery(percent: f64) -> f64 {
    percent / 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockId;

    const EPS: f64 = 1e-9;

    fn block() -> BlockProgress {
        BlockProgress::new(BlockId::new("b1").unwrap())
    }

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = Difficulty::ALL.iter().map(|d| difficulty_weight(*d)).sum();
        assert!((total - 1.0).abs() < EPS);
    }

    #[test]
    fn no_attempts_means_zero_mastery() {
        let breakdown = calculate_block_mastery(&block());
        assert_eq!(breakdown.mastery, 0.0);
        assert_eq!(breakdown.accuracy_by_difficulty, PerDifficulty::new(None, None, None));
        assert_eq!(breakdown.total_attempted, 0);
    }

    #[test]
    fn easy_only_perfect_accuracy_is_full_mastery() {
        let breakdown =
            calculate_mastery(&PerDifficulty::new(5, 0, 0), &PerDifficulty::new(5, 0, 0));
        assert!((breakdown.mastery - 1.0).abs() < EPS);
        assert_eq!(breakdown.accuracy_by_difficulty.medium, None);
    }

    #[test]
    fn weighted_mix_renormalises_over_attempted_tiers() {
        // easy 1/2 (0.5 * 0.2) + hard 1/1 (1.0 * 0.4) over weight 0.6
        let breakdown =
            calculate_mastery(&PerDifficulty::new(2, 0, 1), &PerDifficulty::new(1, 0, 1));
        assert!((breakdown.mastery - 0.5 / 0.6).abs() < EPS);
        assert_eq!(breakdown.total_attempted, 3);
        assert_eq!(breakdown.total_correct, 2);
    }

    #[test]
    fn all_tiers_use_full_weights() {
        let breakdown =
            calculate_mastery(&PerDifficulty::new(4, 4, 4), &PerDifficulty::new(4, 2, 1));
        let expected = 1.0 * 0.2 + 0.5 * 0.4 + 0.25 * 0.4;
        assert!((breakdown.mastery - expected).abs() < EPS);
    }

    #[test]
    fn update_after_answer_does_not_mutate_input() {
        let original = block();
        let updated = update_mastery_after_answer(&original, Difficulty::Medium, true);
        assert_eq!(original.questions_attempted().total(), 0);
        assert_eq!(updated.questions_attempted().medium, 1);
        assert_eq!(updated.questions_correct().medium, 1);
        assert!((updated.mastery_score() - 1.0).abs() < EPS);
    }

    #[test]
    fn incorrect_answer_only_counts_attempt() {
        let updated = update_mastery_after_answer(&block(), Difficulty::Hard, false);
        assert_eq!(updated.hard_attempted(), 1);
        assert_eq!(updated.questions_correct().hard, 0);
        assert_eq!(updated.mastery_score(), 0.0);
    }

    #[test]
    fn delta_accumulates_without_resetting() {
        let mut mastery = 0.0;
        for _ in 0..8 {
            mastery = apply_mastery_delta(mastery, 0.05);
            assert!(mastery > 0.0);
        }
        assert!((mastery - 0.40).abs() < EPS);
    }

    #[test]
    fn delta_is_clamped() {
        assert_eq!(apply_mastery_delta(0.95, 0.2), 1.0);
        assert_eq!(apply_mastery_delta(0.1, -0.5), 0.0);
        assert_eq!(apply_mastery_delta(0.3, f64::NAN), 0.3);
    }

    #[test]
    fn percent_round_trip() {
        for x in [0.0, 0.25, 0.7, 1.0] {
            assert_eq!(percent_to_mastery(mastery_to_percent(x)), x);
        }
        assert_eq!(mastery_to_percent(0.25), 25.0);
    }
}
