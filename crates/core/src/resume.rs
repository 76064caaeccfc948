use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mastery::calculate_mastery;
use crate::model::{
    BlockId, BlockProgress, Difficulty, DifficultyMode, QuestionAvailability, SessionState,
    SessionStateError, SessionStatus, StoredBlockProgress, StoredSession,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResumeError {
    #[error("question availability lists no blocks for lesson {lesson}")]
    NoAvailableBlocks { lesson: String },

    #[error("cannot rebuild progress for an empty block list")]
    NoBlocks,

    #[error(transparent)]
    State(#[from] SessionStateError),
}

/// Where a (re)started session should pick up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePosition {
    pub block_id: BlockId,
    pub block_index: usize,
    pub difficulty: Difficulty,
    /// A non-completed stored session was supplied, even if it held no progress.
    pub is_resume: bool,
}

/// Resolve the starting block and difficulty from a persisted session.
///
/// A missing or completed session starts fresh on block 0 at `easy`. The
/// stored index is clamped into range; the difficulty comes from the fixed
/// mode setting, then the block's stored difficulty, then `easy`.
///
/// # Errors
///
/// Returns `ResumeError::NoAvailableBlocks` if `availability` has no blocks.
pub fn extract_resume_position(
    stored: Option<&StoredSession>,
    availability: &QuestionAvailability,
) -> Result<ResumePosition, ResumeError> {
    let first = availability
        .by_block
        .first()
        .ok_or_else(|| ResumeError::NoAvailableBlocks {
            lesson: availability.lesson_template_id.to_string(),
        })?;

    let stored = match stored {
        Some(session) if session.status != SessionStatus::Completed => session,
        _ => {
            return Ok(ResumePosition {
                block_id: first.block_id.clone(),
                block_index: 0,
                difficulty: Difficulty::Easy,
                is_resume: false,
            });
        }
    };

    let block_index = clamp_index(stored.current_block_index, availability.block_count());
    let block_id = availability.by_block[block_index].block_id.clone();

    let difficulty = if stored.difficulty_mode == Some(DifficultyMode::Fixed) {
        Difficulty::parse_lenient(stored.fixed_difficulty.as_deref())
    } else {
        stored
            .block(block_id.as_str())
            .and_then(|b| Difficulty::parse_lenient(b.current_difficulty.as_deref()))
    }
    .unwrap_or_default();

    Ok(ResumePosition {
        block_id,
        block_index,
        difficulty,
        is_resume: true,
    })
}

/// Rebuild a `SessionState` from stored per-block records.
///
/// Every block before `current_index` is complete, whatever the record says.
/// Stored values are normalised: out-of-range mastery is clamped, correct
/// counts are capped at attempted counts and missing blocks start fresh.
/// `overall_mastery` of the result is the current block's score.
///
/// # Errors
///
/// Returns `ResumeError::NoBlocks` if `block_ids` is empty.
pub fn calculate_resume_progress(
    block_ids: &[BlockId],
    current_index: usize,
    stored: Option<&[StoredBlockProgress]>,
    now: DateTime<Utc>,
) -> Result<SessionState, ResumeError> {
    if block_ids.is_empty() {
        return Err(ResumeError::NoBlocks);
    }
    let current_index = current_index.min(block_ids.len() - 1);
    let stored = stored.unwrap_or_default();

    let blocks = block_ids
        .iter()
        .enumerate()
        .map(|(index, block_id)| {
            let record = stored.iter().find(|r| r.block_id == block_id.as_str());
            let progress = record.map_or_else(
                || BlockProgress::new(block_id.clone()),
                |r| normalize_stored_block(block_id, r, now),
            );
            if index < current_index {
                progress.completed(now)
            } else {
                progress
            }
        })
        .collect();

    Ok(SessionState::from_blocks(blocks, current_index)?)
}

fn clamp_index(raw: i64, len: usize) -> usize {
    let last = len.saturating_sub(1);
    usize::try_from(raw.max(0)).map_or(last, |index| index.min(last))
}

fn normalize_stored_block(
    block_id: &BlockId,
    record: &StoredBlockProgress,
    now: DateTime<Utc>,
) -> BlockProgress {
    let attempted = record.questions_attempted.clone().unwrap_or_default();
    let correct = record
        .questions_correct
        .clone()
        .unwrap_or_default()
        .map(|difficulty, &count| count.min(attempted[difficulty]));

    let mastery_score = match record.mastery_score {
        Some(score) if score.is_nan() => 0.0,
        Some(score) => score.clamp(0.0, 1.0),
        None => calculate_mastery(&attempted, &correct).mastery,
    };

    let mut progress = BlockProgress::new(block_id.clone());
    progress.questions_attempted = attempted;
    progress.questions_correct = correct;
    progress.mastery_score = mastery_score;
    progress.student_requested_advance = record.student_requested_advance;

    if record.is_complete || record.student_requested_advance || record.completed_at.is_some() {
        progress.is_complete = true;
        progress.completed_at = Some(record.completed_at.unwrap_or(now));
    }
    progress
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
