#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod question_bank;
pub mod sessions;

pub use practice_core::Clock;
pub use sessions as session;

pub use error::{QuestionBankError, SessionError};
pub use question_bank::{InMemoryQuestionBank, QuestionBank};

pub use sessions::{
    AdvanceOutcome, AnswerOutcome, PracticeSession, QuestionSource, ServedQuestion,
    SessionLoopService, SessionProgress,
};
