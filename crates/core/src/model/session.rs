use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::block::BlockProgress;
use crate::model::ids::BlockId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("a session needs at least one block")]
    NoBlocks,

    #[error("block index {index} is out of bounds for {total} blocks")]
    IndexOutOfBounds { index: usize, total: usize },

    #[error("expected progress for block {expected}, got {provided}")]
    BlockMismatch { expected: BlockId, provided: BlockId },
}

/// Where the learner is within the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    #[default]
    Question,
    Complete,
}

/// Full state of a multi-block practice session.
///
/// `completed_blocks`, `overall_mastery`, `session_complete` and `stage` are
/// derived from `blocks_progress` and recomputed on every transition.
/// `overall_mastery` mirrors the *current* block's mastery score; the mean
/// across blocks is a reporting aggregate (`progression::calculate_overall_mastery`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionStateRecord")]
pub struct SessionState {
    pub(crate) current_block_index: usize,
    pub(crate) total_blocks: usize,
    pub(crate) blocks_progress: Vec<BlockProgress>,
    pub(crate) completed_blocks: usize,
    pub(crate) overall_mastery: f64,
    pub(crate) session_complete: bool,
    pub(crate) stage: SessionStage,
}

/// Serialized shape of `SessionState`; derived fields are recomputed on load.
#[derive(Deserialize)]
struct SessionStateRecord {
    current_block_index: usize,
    blocks_progress: Vec<BlockProgress>,
}

impl TryFrom<SessionStateRecord> for SessionState {
    type Error = SessionStateError;

    fn try_from(record: SessionStateRecord) -> Result<Self, Self::Error> {
        Self::from_blocks(record.blocks_progress, record.current_block_index)
    }
}

impl SessionState {
    /// Start a session over the given blocks, positioned on the first block.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NoBlocks` if `block_ids` is empty.
    pub fn new(block_ids: impl IntoIterator<Item = BlockId>) -> Result<Self, SessionStateError> {
        let blocks = block_ids.into_iter().map(BlockProgress::new).collect();
        Self::from_blocks(blocks, 0)
    }

    /// Build a session from existing block progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NoBlocks` if `blocks` is empty.
    /// Returns `SessionStateError::IndexOutOfBounds` if `current_block_index` is past the last block.
    pub fn from_blocks(
        blocks: Vec<BlockProgress>,
        current_block_index: usize,
    ) -> Result<Self, SessionStateError> {
        if blocks.is_empty() {
            return Err(SessionStateError::NoBlocks);
        }
        if current_block_index >= blocks.len() {
            return Err(SessionStateError::IndexOutOfBounds {
                index: current_block_index,
                total: blocks.len(),
            });
        }

        Ok(Self {
            current_block_index,
            total_blocks: blocks.len(),
            blocks_progress: blocks,
            completed_blocks: 0,
            overall_mastery: 0.0,
            session_complete: false,
            stage: SessionStage::Question,
        }
        .resync())
    }

    #[must_use]
    pub fn current_block_index(&self) -> usize {
        self.current_block_index
    }

    #[must_use]
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    #[must_use]
    pub fn blocks_progress(&self) -> &[BlockProgress] {
        &self.blocks_progress
    }

    #[must_use]
    pub fn completed_blocks(&self) -> usize {
        self.completed_blocks
    }

    /// Mastery of the active block (decimal form).
    #[must_use]
    pub fn overall_mastery(&self) -> f64 {
        self.overall_mastery
    }

    #[must_use]
    pub fn session_complete(&self) -> bool {
        self.session_complete
    }

    #[must_use]
    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    /// Progress of the block the learner is on.
    #[must_use]
    pub fn current_block(&self) -> &BlockProgress {
        // `current_block_index` is bounds-checked at every construction site.
        &self.blocks_progress[self.current_block_index]
    }

    /// Whether the learner is on the final block.
    #[must_use]
    pub fn is_last_block(&self) -> bool {
        crate::progression::is_last_block(
            self.completed_blocks,
            self.total_blocks,
            self.current_block_index,
        )
    }

    /// Replace the current block's progress (e.g. after an answer) and resync derived fields.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::BlockMismatch` if `progress` belongs to another block.
    pub fn with_current_block(&self, progress: BlockProgress) -> Result<Self, SessionStateError> {
        let expected = self.current_block().block_id();
        if expected != progress.block_id() {
            return Err(SessionStateError::BlockMismatch {
                expected: expected.clone(),
                provided: progress.block_id().clone(),
            });
        }

        let mut next = self.clone();
        next.blocks_progress[self.current_block_index] = progress;
        Ok(next.resync())
    }

    /// Recompute every derived field from `blocks_progress`.
    pub(crate) fn resync(mut self) -> Self {
        self.total_blocks = self.blocks_progress.len();
        self.completed_blocks = crate::progression::count_completed_blocks(&self.blocks_progress);
        self.overall_mastery = self.current_block().mastery_score();
        self.session_complete = self.completed_blocks == self.total_blocks;
        self.stage = if self.session_complete {
            SessionStage::Complete
        } else {
            SessionStage::Question
        };
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
