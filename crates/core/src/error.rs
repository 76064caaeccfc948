use thiserror::Error;

use crate::model::{
    BlockProgressError, DifficultyParseError, IdError, QuestionRequestError, SessionStateError,
    SettingsError,
};
use crate::pool::PoolError;
use crate::resume::ResumeError;

/// Any error raised by the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Difficulty(#[from] DifficultyParseError),
    #[error(transparent)]
    QuestionRequest(#[from] QuestionRequestError),
    #[error(transparent)]
    BlockProgress(#[from] BlockProgressError),
    #[error(transparent)]
    SessionState(#[from] SessionStateError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Resume(#[from] ResumeError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockId, QuestionRequest, SessionState};

    fn start(block: &str, difficulty: &str) -> Result<SessionState, Error> {
        let request = QuestionRequest::parse("lesson-1", block, difficulty)?;
        Ok(SessionState::new([BlockId::new(request.block_id().as_str())?])?)
    }

    #[test]
    fn core_errors_convert_into_aggregate() {
        assert!(start("b1", "easy").is_ok());
        let err = start("b1", "extreme").unwrap_err();
        assert!(matches!(
            err,
            Error::QuestionRequest(QuestionRequestError::InvalidDifficulty { .. })
        ));
        assert_eq!(
            err.to_string(),
            r#"invalid difficulty "extreme", expected one of easy|medium|hard"#
        );
    }
}
