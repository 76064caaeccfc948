use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::{is_block_complete, mark_block_complete};
use crate::model::{BlockProgress, SessionState};

/// Whether `index` is the final block of the session.
///
/// True when the completed count has reached the total **or** the index points
/// at the last slot. The counter alone can lag behind the blocks (a block
/// re-completed without incrementing it), so both checks are required.
#[must_use]
pub fn is_last_block(completed_blocks: usize, total_blocks: usize, current_index: usize) -> bool {
    completed_blocks >= total_blocks || current_index >= total_blocks.saturating_sub(1)
}

#[must_use]
pub fn count_completed_blocks(blocks: &[BlockProgress]) -> usize {
    blocks.iter().filter(|b| b.is_complete()).count()
}

/// Next block with `is_complete == false`, scanning forward from `current_index`.
///
/// Blocks before `current_index` are only considered once the forward scan
/// comes up empty, so out-of-order completion never strands an earlier block.
/// Returns `None` when every block is complete.
#[must_use]
pub fn get_next_incomplete_block_index(
    blocks: &[BlockProgress],
    current_index: usize,
) -> Option<usize> {
    let start = current_index.min(blocks.len());
    let forward = (start..blocks.len()).find(|&i| !blocks[i].is_complete());
    forward.or_else(|| (0..start).find(|&i| !blocks[i].is_complete()))
}

/// Mean mastery across all blocks, for reporting only.
///
/// `SessionState::overall_mastery` tracks the active block instead.
#[must_use]
pub fn calculate_overall_mastery(blocks: &[BlockProgress]) -> f64 {
    if blocks.is_empty() {
        return 0.0;
    }
    let sum: f64 = blocks.iter().map(BlockProgress::mastery_score).sum();
    sum / blocks.len() as f64
}

/// Mark the current block complete, move to the next incomplete block and
/// recompute the derived counters in one step.
///
/// When no incomplete block remains the index stays put and the session
/// moves to the `complete` stage.
#[must_use]
pub fn transition_after_block_complete(state: &SessionState, now: DateTime<Utc>) -> SessionState {
    let mut next = state.clone();
    let index = state.current_block_index;
    next.blocks_progress[index] = mark_block_complete(&state.blocks_progress[index], now);

    if let Some(next_index) = get_next_incomplete_block_index(&next.blocks_progress, index) {
        next.current_block_index = next_index;
    }
    next.resync()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionCompletionOutcome {
    /// The current block completed and the session moved on (or finished).
    pub should_progress: bool,
    pub new_block_index: usize,
    pub session_complete: bool,
    pub updated_state: SessionState,
}

/// Evaluate the current block after an answer and transition if it is done.
///
/// The caller is responsible for resetting difficulty to `easy` when
/// `new_block_index` differs from the previous index.
///
/// The forward-then-wrap scan of `get_next_incomplete_block_index` subsumes
/// `is_last_block`: on the last block it finds nothing and the session completes.
#[must_use]
pub fn process_question_completion(
    state: &SessionState,
    now: DateTime<Utc>,
) -> QuestionCompletionOutcome {
    let current = state.current_block();
    if !current.is_complete() && !is_block_complete(current) {
        let updated_state = state.clone().resync();
        return QuestionCompletionOutcome {
            should_progress: false,
            new_block_index: updated_state.current_block_index,
            session_complete: updated_state.session_complete,
            updated_state,
        };
    }

    let updated_state = transition_after_block_complete(state, now);
    QuestionCompletionOutcome {
        should_progress: true,
        new_block_index: updated_state.current_block_index,
        session_complete: updated_state.session_complete,
        updated_state,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
