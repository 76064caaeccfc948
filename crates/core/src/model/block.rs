use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::difficulty::{Difficulty, PerDifficulty};
use crate::model::ids::BlockId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlockProgressError {
    #[error("mastery score must be within [0, 1], got {provided}")]
    InvalidMastery { provided: f64 },

    #[error("{difficulty} correct count ({correct}) exceeds attempted count ({attempted})")]
    CorrectExceedsAttempted {
        difficulty: Difficulty,
        correct: u32,
        attempted: u32,
    },

    #[error("completed_at must be present exactly when the block is complete")]
    CompletionTimestampMismatch,
}

//
// ─── BLOCK PROGRESS ────────────────────────────────────────────────────────────
//

/// Progress of one content block within a practice session.
///
/// Values are never edited in place: the mastery and completion operations
/// take a `&BlockProgress` and return the next value. Once `is_complete` is
/// true it stays true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockProgressRecord")]
pub struct BlockProgress {
    pub(crate) block_id: BlockId,
    pub(crate) questions_attempted: PerDifficulty<u32>,
    pub(crate) questions_correct: PerDifficulty<u32>,
    pub(crate) mastery_score: f64,
    pub(crate) is_complete: bool,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) student_requested_advance: bool,
}

/// Serialized shape of `BlockProgress`, validated through `from_persisted`.
#[derive(Deserialize)]
struct BlockProgressRecord {
    block_id: BlockId,
    questions_attempted: PerDifficulty<u32>,
    questions_correct: PerDifficulty<u32>,
    mastery_score: f64,
    #[serde(default)]
    is_complete: bool,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    student_requested_advance: bool,
}

impl TryFrom<BlockProgressRecord> for BlockProgress {
    type Error = BlockProgressError;

    fn try_from(record: BlockProgressRecord) -> Result<Self, Self::Error> {
        if record.is_complete != record.completed_at.is_some() {
            return Err(BlockProgressError::CompletionTimestampMismatch);
        }
        Self::from_persisted(
            record.block_id,
            record.questions_attempted,
            record.questions_correct,
            record.mastery_score,
            record.completed_at,
            record.student_requested_advance,
        )
    }
}

impl BlockProgress {
    /// Fresh progress for a block nobody has practised yet.
    #[must_use]
    pub fn new(block_id: BlockId) -> Self {
        Self {
            block_id,
            questions_attempted: PerDifficulty::default(),
            questions_correct: PerDifficulty::default(),
            mastery_score: 0.0,
            is_complete: false,
            completed_at: None,
            student_requested_advance: false,
        }
    }

    /// Rehydrate block progress from a persisted or seeded record.
    ///
    /// This is the only public way to set `mastery_score` directly.
    ///
    /// # Errors
    ///
    /// Returns `BlockProgressError::InvalidMastery` if the score is outside `[0, 1]`.
    /// Returns `BlockProgressError::CorrectExceedsAttempted` if a tier has more correct than attempted.
    /// Returns `BlockProgressError::CompletionTimestampMismatch` if `completed_at` disagrees with `is_complete`.
    pub fn from_persisted(
        block_id: BlockId,
        questions_attempted: PerDifficulty<u32>,
        questions_correct: PerDifficulty<u32>,
        mastery_score: f64,
        completed_at: Option<DateTime<Utc>>,
        student_requested_advance: bool,
    ) -> Result<Self, BlockProgressError> {
        if !mastery_score.is_finite() || !(0.0..=1.0).contains(&mastery_score) {
            return Err(BlockProgressError::InvalidMastery {
                provided: mastery_score,
            });
        }
        for difficulty in Difficulty::ALL {
            let attempted = questions_attempted[difficulty];
            let correct = questions_correct[difficulty];
            if correct > attempted {
                return Err(BlockProgressError::CorrectExceedsAttempted {
                    difficulty,
                    correct,
                    attempted,
                });
            }
        }
        if student_requested_advance && completed_at.is_none() {
            return Err(BlockProgressError::CompletionTimestampMismatch);
        }

        Ok(Self {
            block_id,
            questions_attempted,
            questions_correct,
            mastery_score,
            is_complete: completed_at.is_some(),
            completed_at,
            student_requested_advance,
        })
    }

    #[must_use]
    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    #[must_use]
    pub fn questions_attempted(&self) -> &PerDifficulty<u32> {
        &self.questions_attempted
    }

    #[must_use]
    pub fn questions_correct(&self) -> &PerDifficulty<u32> {
        &self.questions_correct
    }

    /// Hard-tier questions attempted, the count the completion gate reads.
    #[must_use]
    pub fn hard_attempted(&self) -> u32 {
        self.questions_attempted.hard
    }

    /// Weighted mastery in decimal form, `0.0..=1.0`.
    #[must_use]
    pub fn mastery_score(&self) -> f64 {
        self.mastery_score
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn student_requested_advance(&self) -> bool {
        self.student_requested_advance
    }

    /// Marks the block complete, keeping the first completion timestamp.
    pub(crate) fn completed(mut self, now: DateTime<Utc>) -> Self {
        if !self.is_complete {
            self.is_complete = true;
            self.completed_at = Some(now);
        }
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
