use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Difficulty, PerDifficulty, QuestionId};

/// Smallest pool a difficulty needs before `get_effective_difficulty` will serve from it.
pub const DEFAULT_MIN_POOL_SIZE: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    #[error("cannot select a question from an empty pool")]
    EmptyPool,
}

//
// ─── RESULT TRACKING ───────────────────────────────────────────────────────────
//

/// Answered question ids for one difficulty.
///
/// An id sits in at most one of the two lists; a correct retry moves it from
/// `incorrect` to `correct`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcomes {
    #[serde(default)]
    pub correct: Vec<QuestionId>,
    #[serde(default)]
    pub incorrect: Vec<QuestionId>,
}

/// Per-difficulty answered ids. Tiers never share a list.
pub type QuestionTracking = PerDifficulty<QuestionOutcomes>;

/// Record an answer against `difficulty` only.
///
/// Correct: the id moves to (or joins) `correct`. Incorrect: the id joins
/// `incorrect` unless that tier already tracks it in either list.
#[must_use]
pub fn track_question_result(
    tracking: &QuestionTracking,
    difficulty: Difficulty,
    question_id: &QuestionId,
    is_correct: bool,
) -> QuestionTracking {
    let mut next = tracking.clone();
    let outcomes = &mut next[difficulty];
    if is_correct {
        outcomes.incorrect.retain(|id| id != question_id);
        if !outcomes.correct.contains(question_id) {
            outcomes.correct.push(question_id.clone());
        }
    } else if !outcomes.correct.contains(question_id) && !outcomes.incorrect.contains(question_id)
    {
        outcomes.incorrect.push(question_id.clone());
    }
    next
}

/// Every answered id at `difficulty`, excluded when fetching fresh questions.
#[must_use]
pub fn get_exclude_all_ids(tracking: &QuestionTracking, difficulty: Difficulty) -> Vec<QuestionId> {
    let outcomes = &tracking[difficulty];
    outcomes
        .correct
        .iter()
        .chain(outcomes.incorrect.iter())
        .cloned()
        .collect()
}

/// Only the correctly answered ids at `difficulty`, excluded when serving a retry.
#[must_use]
pub fn get_exclude_correct_only_ids(
    tracking: &QuestionTracking,
    difficulty: Difficulty,
) -> Vec<QuestionId> {
    tracking[difficulty].correct.clone()
}

//
// ─── EXHAUSTION POLICY ─────────────────────────────────────────────────────────
//

/// What to do once no unseen question remains at the current difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PoolExhaustionDecision {
    /// Re-serve questions previously answered incorrectly.
    Retry { question_ids: Vec<QuestionId> },
    /// Move one tier down.
    Downgrade { to: Difficulty },
    /// Nothing left anywhere below: clear shown ids and allow repeats.
    AllowReset,
}

/// Decide the response to an exhausted pool. Retry always wins over downgrade.
#[must_use]
pub fn get_pool_exhaustion_decision(
    tracking: &QuestionTracking,
    difficulty: Difficulty,
) -> PoolExhaustionDecision {
    let incorrect = &tracking[difficulty].incorrect;
    if !incorrect.is_empty() {
        return PoolExhaustionDecision::Retry {
            question_ids: incorrect.clone(),
        };
    }
    match difficulty.easier() {
        Some(to) => PoolExhaustionDecision::Downgrade { to },
        None => PoolExhaustionDecision::AllowReset,
    }
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSelection {
    pub question_id: QuestionId,
    /// `true` when every pool question had been shown and the shown set was cleared.
    pub pool_reset: bool,
    pub updated_shown_ids: Vec<QuestionId>,
    /// Pool questions not yet shown after this selection.
    pub pool_remaining: usize,
}

/// Pick uniformly among pool questions not in `shown_ids`.
///
/// When all have been shown, the shown set restarts with just the new pick.
///
/// # Errors
///
/// Returns `PoolError::EmptyPool` if `pool` is empty.
pub fn select_random_question<R: Rng + ?Sized>(
    pool: &[QuestionId],
    shown_ids: &[QuestionId],
    rng: &mut R,
) -> Result<QuestionSelection, PoolError> {
    let shown: HashSet<&QuestionId> = shown_ids.iter().collect();
    let unseen: Vec<&QuestionId> = pool.iter().filter(|id| !shown.contains(id)).collect();

    let (question_id, pool_reset, updated_shown_ids) = match unseen.choose(rng) {
        Some(&picked) => {
            let mut updated = shown_ids.to_vec();
            updated.push(picked.clone());
            (picked.clone(), false, updated)
        }
        None => {
            let picked = pool.choose(rng).ok_or(PoolError::EmptyPool)?;
            (picked.clone(), true, vec![picked.clone()])
        }
    };

    let shown_after: HashSet<&QuestionId> = updated_shown_ids.iter().collect();
    let pool_remaining = pool.iter().filter(|id| !shown_after.contains(id)).count();

    Ok(QuestionSelection {
        question_id,
        pool_reset,
        updated_shown_ids,
        pool_remaining,
    })
}

/// First difficulty on the chain `requested → … → easy` whose pool holds at
/// least `min_size` questions. Falls back to `Easy` even if that pool is small.
#[must_use]
pub fn get_effective_difficulty(
    requested: Difficulty,
    pool_sizes: &PerDifficulty<usize>,
    min_size: usize,
) -> Difficulty {
    requested
        .downgrade_chain()
        .find(|d| pool_sizes[*d] >= min_size)
        .unwrap_or(Difficulty::Easy)
}

//
// ─── SHOWN-ID LIFETIME ─────────────────────────────────────────────────────────
//

/// Events that might plausibly clear shown ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShownIdsResetTrigger {
    SessionStart,
    DifficultyChange,
    BlockChange,
    PoolExhausted,
}

/// Shown ids survive difficulty and block changes; only a new session clears them.
#[must_use]
pub fn should_reset_shown_ids(trigger: ShownIdsResetTrigger) -> bool {
    match trigger {
        ShownIdsResetTrigger::SessionStart => true,
        ShownIdsResetTrigger::DifficultyChange
        | ShownIdsResetTrigger::BlockChange
        | ShownIdsResetTrigger::PoolExhausted => false,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn q(id: &str) -> QuestionId {
        QuestionId::new(id).unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<QuestionId> {
        raw.iter().map(|id| q(id)).collect()
    }

    #[test]
    fn incorrect_then_correct_moves_between_lists() {
        let tracking = QuestionTracking::default();
        let tracking = track_question_result(&tracking, Difficulty::Medium, &q("q1"), false);
        assert_eq!(tracking.medium.incorrect, ids(&["q1"]));

        let tracking = track_question_result(&tracking, Difficulty::Medium, &q("q1"), true);
        assert_eq!(tracking.medium.correct, ids(&["q1"]));
        assert!(tracking.medium.incorrect.is_empty());
    }

    #[test]
    fn repeated_incorrect_is_not_duplicated() {
        let tracking = QuestionTracking::default();
        let tracking = track_question_result(&tracking, Difficulty::Easy, &q("q1"), false);
        let tracking = track_question_result(&tracking, Difficulty::Easy, &q("q1"), false);
        assert_eq!(tracking.easy.incorrect.len(), 1);
    }

    #[test]
    fn incorrect_after_correct_keeps_correct() {
        let tracking = QuestionTracking::default();
        let tracking = track_question_result(&tracking, Difficulty::Easy, &q("q1"), true);
        let tracking = track_question_result(&tracking, Difficulty::Easy, &q("q1"), false);
        assert_eq!(tracking.easy.correct, ids(&["q1"]));
        assert!(tracking.easy.incorrect.is_empty());
    }

    #[test]
    fn tiers_are_isolated() {
        let tracking = QuestionTracking::default();
        let tracking = track_question_result(&tracking, Difficulty::Hard, &q("q1"), true);
        assert!(get_exclude_all_ids(&tracking, Difficulty::Easy).is_empty());
        assert_eq!(get_exclude_all_ids(&tracking, Difficulty::Hard), ids(&["q1"]));
    }

    #[test]
    fn exclude_lists() {
        let mut tracking = QuestionTracking::default();
        tracking = track_question_result(&tracking, Difficulty::Easy, &q("a"), true);
        tracking = track_question_result(&tracking, Difficulty::Easy, &q("b"), false);
        assert_eq!(get_exclude_all_ids(&tracking, Difficulty::Easy), ids(&["a", "b"]));
        assert_eq!(get_exclude_correct_only_ids(&tracking, Difficulty::Easy), ids(&["a"]));
    }

    #[test]
    fn retry_wins_over_downgrade() {
        let mut tracking = QuestionTracking::default();
        tracking.hard.incorrect = ids(&["h1", "h2"]);
        assert_eq!(
            get_pool_exhaustion_decision(&tracking, Difficulty::Hard),
            PoolExhaustionDecision::Retry {
                question_ids: ids(&["h1", "h2"])
            }
        );
    }

    #[test]
    fn downgrade_then_allow_reset() {
        let tracking = QuestionTracking::default();
        assert_eq!(
            get_pool_exhaustion_decision(&tracking, Difficulty::Hard),
            PoolExhaustionDecision::Downgrade {
                to: Difficulty::Medium
            }
        );
        assert_eq!(
            get_pool_exhaustion_decision(&tracking, Difficulty::Medium),
            PoolExhaustionDecision::Downgrade {
                to: Difficulty::Easy
            }
        );
        assert_eq!(
            get_pool_exhaustion_decision(&tracking, Difficulty::Easy),
            PoolExhaustionDecision::AllowReset
        );
    }

    #[test]
    fn selection_skips_shown_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = ids(&["a", "b", "c"]);
        let shown = ids(&["a", "b"]);
        let selection = select_random_question(&pool, &shown, &mut rng).unwrap();
        assert_eq!(selection.question_id, q("c"));
        assert!(!selection.pool_reset);
        assert_eq!(selection.updated_shown_ids, ids(&["a", "b", "c"]));
        assert_eq!(selection.pool_remaining, 0);
    }

    #[test]
    fn selection_resets_when_everything_was_shown() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = ids(&["a", "b"]);
        let selection = select_random_question(&pool, &pool, &mut rng).unwrap();
        assert!(selection.pool_reset);
        assert_eq!(selection.updated_shown_ids, vec![selection.question_id.clone()]);
        assert_eq!(selection.pool_remaining, 1);
    }

    #[test]
    fn selection_never_repeats_until_exhausted() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = ids(&["a", "b", "c", "d"]);
        let mut shown = Vec::new();
        let mut seen = HashSet::new();
        for expected_remaining in (0..4).rev() {
            let selection = select_random_question(&pool, &shown, &mut rng).unwrap();
            assert!(seen.insert(selection.question_id.clone()));
            assert_eq!(selection.pool_remaining, expected_remaining);
            shown = selection.updated_shown_ids;
        }
    }

    #[test]
    fn empty_pool_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select_random_question(&[], &[], &mut rng).unwrap_err();
        assert_eq!(err, PoolError::EmptyPool);
    }

    #[test]
    fn effective_difficulty_walks_down_chain() {
        let sizes = PerDifficulty::new(5, 1, 0);
        assert_eq!(
            get_effective_difficulty(Difficulty::Hard, &sizes, DEFAULT_MIN_POOL_SIZE),
            Difficulty::Easy
        );
        let sizes = PerDifficulty::new(5, 3, 0);
        assert_eq!(
            get_effective_difficulty(Difficulty::Hard, &sizes, DEFAULT_MIN_POOL_SIZE),
            Difficulty::Medium
        );
        assert_eq!(
            get_effective_difficulty(Difficulty::Medium, &PerDifficulty::new(0, 0, 9), 2),
            Difficulty::Easy
        );
    }

    #[test]
    fn effective_difficulty_never_upgrades() {
        let sizes = PerDifficulty::new(0, 10, 10);
        assert_eq!(get_effective_difficulty(Difficulty::Easy, &sizes, 2), Difficulty::Easy);
    }

    #[test]
    fn only_session_start_clears_shown_ids() {
        assert!(should_reset_shown_ids(ShownIdsResetTrigger::SessionStart));
        assert!(!should_reset_shown_ids(ShownIdsResetTrigger::DifficultyChange));
        assert!(!should_reset_shown_ids(ShownIdsResetTrigger::BlockChange));
        assert!(!should_reset_shown_ids(ShownIdsResetTrigger::PoolExhausted));
    }
}
