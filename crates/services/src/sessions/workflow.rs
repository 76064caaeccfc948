use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use practice_core::adaptive::{AnswerSignals, StudentHistory};
use practice_core::model::{
    Difficulty, LessonTemplateId, PerDifficulty, PracticeSettings, QuestionId, QuestionRequest,
    SessionState, StoredSession,
};
use practice_core::resume::{calculate_resume_progress, extract_resume_position};

use super::service::{AdvanceOutcome, AnswerOutcome, PracticeSession, ServedQuestion};
use crate::Clock;
use crate::error::{QuestionBankError, SessionError};
use crate::question_bank::QuestionBank;

/// Orchestrates session start/resume and question serving against a `QuestionBank`.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    settings: PracticeSettings,
    bank: Arc<dyn QuestionBank>,
    rng: Arc<Mutex<StdRng>>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock, settings: PracticeSettings, bank: Arc<dyn QuestionBank>) -> Self {
        Self {
            clock,
            settings,
            bank,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Use a deterministic question order.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    #[must_use]
    pub fn settings(&self) -> &PracticeSettings {
        &self.settings
    }

    /// Start a lesson, resuming from `stored` when it is an unfinished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuestionBank` if availability cannot be loaded.
    /// Returns `SessionError::Resume` if the lesson has no blocks.
    pub async fn start_session(
        &self,
        lesson: &LessonTemplateId,
        stored: Option<&StoredSession>,
        history: Option<StudentHistory>,
    ) -> Result<PracticeSession, SessionError> {
        let now = self.clock.now();
        let availability = self.bank.availability(lesson).await?;
        let position = extract_resume_position(stored, &availability)?;
        let block_ids = availability.block_ids();

        let state = match stored {
            Some(session) if position.is_resume => calculate_resume_progress(
                &block_ids,
                position.block_index,
                Some(session.blocks_progress.as_slice()),
                now,
            )?,
            _ => SessionState::new(block_ids)?,
        };

        info!(
            lesson = %lesson,
            block_index = position.block_index,
            difficulty = %position.difficulty,
            is_resume = position.is_resume,
            "session started"
        );

        PracticeSession::resume(
            lesson.clone(),
            state,
            &position,
            self.settings.clone(),
            history,
            now,
        )
    }

    /// Fetch the current block's pools and serve the next question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is complete.
    /// Returns `SessionError::QuestionBank` if the pools cannot be loaded.
    pub async fn next_question(
        &self,
        session: &mut PracticeSession,
    ) -> Result<ServedQuestion, SessionError> {
        if session.is_complete() {
            return Err(SessionError::Completed);
        }
        let pools = self.load_pools(session).await?;

        let mut rng = self
            .rng
            .lock()
            .map_err(|e| QuestionBankError::Connection(e.to_string()))?;
        Ok(session.serve_question(&pools, &mut *rng)?.clone())
    }

    /// Answer the served question at the service clock's time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if no question is pending or the session is complete.
    pub fn answer_current(
        &self,
        session: &mut PracticeSession,
        is_correct: bool,
        signals: &AnswerSignals,
    ) -> Result<AnswerOutcome, SessionError> {
        session.record_answer(is_correct, signals, self.clock.now())
    }

    /// Manually advance past the current block.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is complete.
    pub fn advance_block(
        &self,
        session: &mut PracticeSession,
    ) -> Result<AdvanceOutcome, SessionError> {
        session.request_advance(self.clock.now())
    }

    async fn load_pools(
        &self,
        session: &PracticeSession,
    ) -> Result<PerDifficulty<Vec<QuestionId>>, SessionError> {
        let mut pools = PerDifficulty::<Vec<QuestionId>>::default();
        for difficulty in Difficulty::ALL {
            let request = QuestionRequest::new(
                session.lesson_template_id().clone(),
                session.current_block_id().clone(),
                difficulty,
            );
            pools[difficulty] = self.bank.question_ids(&request).await?;
        }
        Ok(pools)
    }
}
