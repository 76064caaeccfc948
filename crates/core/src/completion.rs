use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::BlockProgress;

/// Minimum mastery score for a block to count as mastered.
pub const MASTERY_THRESHOLD: f64 = 0.70;

/// Hard questions that must be *attempted* (not necessarily answered
/// correctly) before a block can complete on mastery.
pub const REQUIRED_HARD_ATTEMPTS: u32 = 2;

/// Why a block is or is not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    CriteriaMet,
    ManualAdvance,
    MasteryInsufficient,
    HardQuestionsInsufficient,
    BothInsufficient,
}

/// What is still missing for an incomplete block. Satisfied requirements are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsRemaining {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery_needed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_questions_needed: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionCheck {
    pub is_complete: bool,
    pub reason: CompletionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_remaining: Option<RequirementsRemaining>,
}

/// `true` when the learner asked to advance, or mastery ≥ 0.70 with at least two hard attempts.
#[must_use]
pub fn is_block_complete(progress: &BlockProgress) -> bool {
    check_block_completion(progress).is_complete
}

/// Evaluate the completion rule and explain the outcome.
///
/// Manual advance is checked first and overrides both gates.
#[must_use]
pub fn check_block_completion(progress: &BlockProgress) -> CompletionCheck {
    if progress.student_requested_advance() {
        return CompletionCheck {
            is_complete: true,
            reason: CompletionReason::ManualAdvance,
            requirements_remaining: None,
        };
    }

    let mastery = progress.mastery_score();
    let hard_attempted = progress.hard_attempted();
    let mastery_ok = mastery >= MASTERY_THRESHOLD;
    let hard_ok = hard_attempted >= REQUIRED_HARD_ATTEMPTS;

    let reason = match (mastery_ok, hard_ok) {
        (true, true) => {
            return CompletionCheck {
                is_complete: true,
                reason: CompletionReason::CriteriaMet,
                requirements_remaining: None,
            };
        }
        (false, true) => CompletionReason::MasteryInsufficient,
        (true, false) => CompletionReason::HardQuestionsInsufficient,
        (false, false) => CompletionReason::BothInsufficient,
    };

    CompletionCheck {
        is_complete: false,
        reason,
        requirements_remaining: Some(RequirementsRemaining {
            mastery_needed: (!mastery_ok).then(|| (MASTERY_THRESHOLD - mastery).max(0.0)),
            hard_questions_needed: (!hard_ok)
                .then(|| REQUIRED_HARD_ATTEMPTS.saturating_sub(hard_attempted)),
        }),
    }
}

/// Returns the block marked complete at `now`. An already complete block keeps its timestamp.
#[must_use]
pub fn mark_block_complete(progress: &BlockProgress, now: DateTime<Utc>) -> BlockProgress {
    progress.clone().completed(now)
}

/// Learner-triggered override: completes the block regardless of mastery.
#[must_use]
pub fn mark_manual_advance(progress: &BlockProgress, now: DateTime<Utc>) -> BlockProgress {
    let mut next = progress.clone().completed(now);
    next.student_requested_advance = true;
    next
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockId, PerDifficulty};
    use crate::time::fixed_now;

    fn progress(mastery: f64, hard_attempted: u32, hard_correct: u32) -> BlockProgress {
        BlockProgress::from_persisted(
            BlockId::new("b1").unwrap(),
            PerDifficulty::new(0, 0, hard_attempted),
            PerDifficulty::new(0, 0, hard_correct),
            mastery,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn criteria_met_with_zero_hard_correct() {
        let check = check_block_completion(&progress(0.75, 2, 0));
        assert!(check.is_complete);
        assert_eq!(check.reason, CompletionReason::CriteriaMet);
        assert!(check.requirements_remaining.is_none());
    }

    #[test]
    fn exact_threshold_counts() {
        assert!(is_block_complete(&progress(0.70, 2, 1)));
    }

    #[test]
    fn mastery_insufficient_reports_gap_only() {
        let check = check_block_completion(&progress(0.5, 3, 3));
        assert!(!check.is_complete);
        assert_eq!(check.reason, CompletionReason::MasteryInsufficient);
        let remaining = check.requirements_remaining.unwrap();
        assert!((remaining.mastery_needed.unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(remaining.hard_questions_needed, None);
    }

    #[test]
    fn hard_questions_insufficient_reports_count_only() {
        let check = check_block_completion(&progress(0.9, 1, 1));
        assert_eq!(check.reason, CompletionReason::HardQuestionsInsufficient);
        let remaining = check.requirements_remaining.unwrap();
        assert_eq!(remaining.mastery_needed, None);
        assert_eq!(remaining.hard_questions_needed, Some(1));
    }

    #[test]
    fn both_insufficient() {
        let check = check_block_completion(&progress(0.1, 0, 0));
        assert_eq!(check.reason, CompletionReason::BothInsufficient);
        let remaining = check.requirements_remaining.unwrap();
        assert_eq!(remaining.hard_questions_needed, Some(2));
        assert!(remaining.mastery_needed.is_some());
    }

    #[test]
    fn manual_advance_dominates() {
        let advanced = mark_manual_advance(&progress(0.0, 0, 0), fixed_now());
        let check = check_block_completion(&advanced);
        assert!(check.is_complete);
        assert_eq!(check.reason, CompletionReason::ManualAdvance);
        assert!(advanced.student_requested_advance());
        assert_eq!(advanced.completed_at(), Some(fixed_now()));
    }

    #[test]
    fn mark_complete_leaves_input_untouched() {
        let original = progress(0.8, 2, 2);
        let completed = mark_block_complete(&original, fixed_now());
        assert!(!original.is_complete());
        assert!(completed.is_complete());
        assert!(!completed.student_requested_advance());
    }

    #[test]
    fn requirements_serialize_without_satisfied_fields() {
        let check = check_block_completion(&progress(0.9, 0, 0));
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["reason"], "hard_questions_insufficient");
        assert!(json["requirements_remaining"].get("mastery_needed").is_none());
        assert_eq!(json["requirements_remaining"]["hard_questions_needed"], 2);
    }
}
