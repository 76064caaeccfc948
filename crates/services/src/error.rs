//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::model::{
    BlockId, LessonTemplateId, QuestionRequestError, SessionStateError, SettingsError,
};
use practice_core::pool::PoolError;
use practice_core::resume::ResumeError;

/// Errors surfaced by `QuestionBank` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("lesson {0} not found")]
    LessonNotFound(LessonTemplateId),

    #[error("block {block} is not part of lesson {lesson}")]
    UnknownBlock {
        lesson: LessonTemplateId,
        block: BlockId,
    },

    #[error("connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Request(#[from] QuestionRequestError),
}

/// Errors emitted by practice sessions and the session loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,
    #[error("no question is awaiting an answer")]
    NoQuestionServed,
    #[error("no questions available for block {0}")]
    NoQuestions(BlockId),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Resume(#[from] ResumeError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    QuestionBank(#[from] QuestionBankError),
}
