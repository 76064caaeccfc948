use serde::Serialize;

use practice_core::completion::CompletionCheck;
use practice_core::model::{BlockId, Difficulty};

/// Presentation view of a practice session.
///
/// Mastery appears here in percent, already scaled once; every other type
/// carries it as a decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub current_block_id: BlockId,
    pub current_block_index: usize,
    pub total_blocks: usize,
    pub completed_blocks: usize,
    pub current_difficulty: Difficulty,
    /// Mastery of the active block, `0..=100`.
    pub block_mastery_percent: f64,
    /// Mean mastery across all blocks, `0..=100`. Reporting only.
    pub mean_mastery_percent: f64,
    pub questions_answered: u32,
    pub is_last_block: bool,
    pub is_complete: bool,
    pub block_completion: CompletionCheck,
}
