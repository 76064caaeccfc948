use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::difficulty::PerDifficulty;

/// Lifecycle status recorded by the storage layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
    #[serde(other)]
    Unknown,
}

/// How difficulty was chosen when the session was persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyMode {
    #[default]
    Adaptive,
    Fixed,
    #[serde(other)]
    Unknown,
}

/// One block entry of a persisted session, as the storage layer returns it.
///
/// Every field is untrusted: ids and difficulties stay raw strings and are
/// normalised by the resume reconstructor, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredBlockProgress {
    pub block_id: String,
    #[serde(default)]
    pub mastery_score: Option<f64>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub student_requested_advance: bool,
    #[serde(default)]
    pub current_difficulty: Option<String>,
    #[serde(default)]
    pub questions_attempted: Option<PerDifficulty<u32>>,
    #[serde(default)]
    pub questions_correct: Option<PerDifficulty<u32>>,
}

/// Persisted session fragment consumed when resuming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub current_block_index: i64,
    #[serde(default)]
    pub blocks_progress: Vec<StoredBlockProgress>,
    #[serde(default)]
    pub difficulty_mode: Option<DifficultyMode>,
    #[serde(default)]
    pub fixed_difficulty: Option<String>,
}

impl StoredSession {
    /// The stored entry for `block_id`, if any.
    #[must_use]
    pub fn block(&self, block_id: &str) -> Option<&StoredBlockProgress> {
        self.blocks_progress.iter().find(|b| b.block_id == block_id)
    }
}
