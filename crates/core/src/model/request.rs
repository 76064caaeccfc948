use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::difficulty::Difficulty;
use crate::model::ids::{BlockId, LessonTemplateId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionRequestError {
    #[error("lesson template id is empty")]
    EmptyLessonId,

    #[error("block id is empty")]
    EmptyBlockId,

    #[error("invalid difficulty {provided:?}, expected one of easy|medium|hard")]
    InvalidDifficulty { provided: String },
}

/// Validated parameters for fetching questions from the bank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRequest {
    lesson_template_id: LessonTemplateId,
    block_id: BlockId,
    difficulty: Difficulty,
}

impl QuestionRequest {
    /// Validate raw selection parameters.
    ///
    /// Nothing is substituted: an invalid parameter is reported, never defaulted.
    ///
    /// # Errors
    ///
    /// Returns the `QuestionRequestError` variant naming the first invalid parameter.
    pub fn parse(
        lesson_template_id: &str,
        block_id: &str,
        difficulty: &str,
    ) -> Result<Self, QuestionRequestError> {
        let lesson_template_id = LessonTemplateId::new(lesson_template_id)
            .map_err(|_| QuestionRequestError::EmptyLessonId)?;
        let block_id = BlockId::new(block_id).map_err(|_| QuestionRequestError::EmptyBlockId)?;
        let difficulty = difficulty
            .parse()
            .map_err(|_| QuestionRequestError::InvalidDifficulty {
                provided: difficulty.to_owned(),
            })?;

        Ok(Self::new(lesson_template_id, block_id, difficulty))
    }

    /// Build a request from already-typed parts.
    #[must_use]
    pub fn new(
        lesson_template_id: LessonTemplateId,
        block_id: BlockId,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            lesson_template_id,
            block_id,
            difficulty,
        }
    }

    #[must_use]
    pub fn lesson_template_id(&self) -> &LessonTemplateId {
        &self.lesson_template_id
    }

    #[must_use]
    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}
