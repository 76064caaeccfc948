use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use practice_core::adaptive::{
    AnswerSignals, DifficultyChange, EnhancedAdaptiveState, StudentHistory,
    calculate_adaptive_difficulty, calculate_enhanced_adaptive_difficulty,
    calculate_personalized_thresholds,
};
use practice_core::completion::{check_block_completion, mark_manual_advance};
use practice_core::mastery::{mastery_to_percent, update_mastery_after_answer};
use practice_core::model::{
    BlockId, Difficulty, DifficultyMode, LessonTemplateId, PerDifficulty, PracticeSettings,
    QuestionId, SessionState, SessionStateError, SessionStatus, StoredBlockProgress,
    StoredSession,
};
use practice_core::pool::{
    PoolExhaustionDecision, QuestionSelection, QuestionTracking, ShownIdsResetTrigger,
    get_effective_difficulty, get_exclude_all_ids, get_pool_exhaustion_decision,
    select_random_question, should_reset_shown_ids, track_question_result,
};
use practice_core::progression::{
    QuestionCompletionOutcome, calculate_overall_mastery, process_question_completion,
};
use practice_core::resume::ResumePosition;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// How a served question was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// Not yet answered at this difficulty.
    Fresh,
    /// Previously answered incorrectly, served again after the pool ran dry.
    Retry,
    /// Pool fully answered with nothing left to retry; repeats allowed.
    Repeat,
}

/// The question currently awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServedQuestion {
    pub question_id: QuestionId,
    pub block_id: BlockId,
    pub difficulty: Difficulty,
    pub source: QuestionSource,
    pub pool_reset: bool,
    pub pool_remaining: usize,
}

/// Result of answering the served question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub difficulty: Difficulty,
    pub is_correct: bool,
    /// Mastery of the answered block after this answer (decimal).
    pub block_mastery: f64,
    pub difficulty_change: DifficultyChange,
    pub next_difficulty: Difficulty,
    pub block_completed: bool,
    pub new_block_index: usize,
    pub session_complete: bool,
}

/// Result of a learner-requested block advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvanceOutcome {
    pub completed_block: BlockId,
    pub new_block_index: usize,
    pub session_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single-writer state holder for one learner's practice session.
///
/// Each event (serve, answer, advance) replaces the held values with the
/// ones returned by the pure session operations. Events must be applied in
/// order; the session is not meant to be shared between tasks.
pub struct PracticeSession {
    lesson_template_id: LessonTemplateId,
    settings: PracticeSettings,
    state: SessionState,
    adaptive: EnhancedAdaptiveState,
    tracking: QuestionTracking,
    shown_ids: PerDifficulty<Vec<QuestionId>>,
    block_difficulties: Vec<Difficulty>,
    current: Option<ServedQuestion>,
    questions_answered: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl PracticeSession {
    /// Start on the state's current block at `easy`.
    #[must_use]
    pub fn new(
        lesson_template_id: LessonTemplateId,
        state: SessionState,
        settings: PracticeSettings,
        history: Option<StudentHistory>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let history = history.filter(|_| settings.personalization());
        let block_difficulties = vec![Difficulty::Easy; state.total_blocks()];
        let completed_at = state.session_complete().then_some(started_at);

        let mut session = Self {
            lesson_template_id,
            settings,
            state,
            adaptive: EnhancedAdaptiveState::new(Difficulty::Easy, history),
            tracking: QuestionTracking::default(),
            shown_ids: PerDifficulty::default(),
            block_difficulties,
            current: None,
            questions_answered: 0,
            started_at,
            completed_at,
        };
        session.on_trigger(ShownIdsResetTrigger::SessionStart);
        session
    }

    /// Continue a persisted session at the reconstructed position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` if `position` points at a different block than `state`.
    pub fn resume(
        lesson_template_id: LessonTemplateId,
        state: SessionState,
        position: &ResumePosition,
        settings: PracticeSettings,
        history: Option<StudentHistory>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let current = state.current_block().block_id();
        if *current != position.block_id {
            return Err(SessionStateError::BlockMismatch {
                expected: current.clone(),
                provided: position.block_id.clone(),
            }
            .into());
        }

        let mut session = Self::new(lesson_template_id, state, settings, history, started_at);
        session.set_difficulty(position.difficulty);

        // A stored block may already be finished; never serve from it.
        let previous_index = session.state.current_block_index();
        let outcome = process_question_completion(&session.state, started_at);
        if outcome.should_progress {
            session.apply_completion(outcome, previous_index, started_at);
        }
        Ok(session)
    }

    #[must_use]
    pub fn lesson_template_id(&self) -> &LessonTemplateId {
        &self.lesson_template_id
    }

    #[must_use]
    pub fn settings(&self) -> &PracticeSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn adaptive(&self) -> &EnhancedAdaptiveState {
        &self.adaptive
    }

    #[must_use]
    pub fn tracking(&self) -> &QuestionTracking {
        &self.tracking
    }

    #[must_use]
    pub fn shown_ids(&self, difficulty: Difficulty) -> &[QuestionId] {
        &self.shown_ids[difficulty]
    }

    #[must_use]
    pub fn current_block_id(&self) -> &BlockId {
        self.state.current_block().block_id()
    }

    #[must_use]
    pub fn current_difficulty(&self) -> Difficulty {
        self.adaptive.current_difficulty()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&ServedQuestion> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.session_complete()
    }

    /// Pick the next question for the current block from its per-difficulty pools.
    ///
    /// Serves the effective difficulty for the pool sizes, skipping questions
    /// already answered at that difficulty. An exhausted pool retries incorrect
    /// questions first, then moves one tier down, and at `easy` allows repeats.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is complete.
    /// Returns `SessionError::NoQuestions` if the block has no questions at all.
    pub fn serve_question<R: Rng + ?Sized>(
        &mut self,
        pools: &PerDifficulty<Vec<QuestionId>>,
        rng: &mut R,
    ) -> Result<&ServedQuestion, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let block_id = self.current_block_id().clone();

        let requested = self.adaptive.current_difficulty();
        let sizes = pools.map(|_, ids| ids.len());
        let mut difficulty =
            get_effective_difficulty(requested, &sizes, self.settings.min_pool_size());
        if difficulty != requested {
            debug!(from = %requested, to = %difficulty, block_id = %block_id, "pool too small, serving easier difficulty");
            self.set_difficulty(difficulty);
        }

        let (selection, source) = loop {
            let pool = &pools[difficulty];
            let answered = get_exclude_all_ids(&self.tracking, difficulty);
            let fresh: Vec<QuestionId> = pool
                .iter()
                .filter(|id| !answered.contains(id))
                .cloned()
                .collect();

            if !fresh.is_empty() {
                let selection = select_random_question(&fresh, &self.shown_ids[difficulty], rng)?;
                self.remember_shown(difficulty, &selection, &fresh);
                break (selection, QuestionSource::Fresh);
            }

            self.on_trigger(ShownIdsResetTrigger::PoolExhausted);
            match get_pool_exhaustion_decision(&self.tracking, difficulty) {
                PoolExhaustionDecision::Retry { question_ids } => {
                    warn!(difficulty = %difficulty, block_id = %block_id, retry_count = question_ids.len(), "pool exhausted, retrying incorrect questions");
                    let selection = select_random_question(&question_ids, &[], rng)?;
                    break (selection, QuestionSource::Retry);
                }
                PoolExhaustionDecision::Downgrade { to } => {
                    warn!(from = %difficulty, to = %to, block_id = %block_id, "pool exhausted, downgrading");
                    difficulty = to;
                    self.set_difficulty(to);
                }
                PoolExhaustionDecision::AllowReset => {
                    warn!(difficulty = %difficulty, block_id = %block_id, "pool exhausted, allowing repeats");
                    let shown = &self.shown_ids[difficulty];
                    let selection = select_random_question(pool, shown, rng)
                        .map_err(|_| SessionError::NoQuestions(block_id.clone()))?;
                    self.remember_shown(difficulty, &selection, pool);
                    break (selection, QuestionSource::Repeat);
                }
            }
        };

        Ok(&*self.current.insert(ServedQuestion {
            question_id: selection.question_id,
            block_id,
            difficulty,
            source,
            pool_reset: selection.pool_reset,
            pool_remaining: selection.pool_remaining,
        }))
    }

    /// Apply the answer to the served question: one answer, one recompute.
    ///
    /// Updates mastery, question tracking and difficulty, then evaluates block
    /// completion. Moving to another block restarts difficulty at `easy`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is complete.
    /// Returns `SessionError::NoQuestionServed` if no question is pending.
    pub fn record_answer(
        &mut self,
        is_correct: bool,
        signals: &AnswerSignals,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let served = self.current.take().ok_or(SessionError::NoQuestionServed)?;
        let difficulty = served.difficulty;

        let block = update_mastery_after_answer(self.state.current_block(), difficulty, is_correct);
        let block_mastery = block.mastery_score();
        self.state = self.state.with_current_block(block)?;
        self.tracking =
            track_question_result(&self.tracking, difficulty, &served.question_id, is_correct);
        self.questions_answered = self.questions_answered.saturating_add(1);
        debug!(
            question_id = %served.question_id,
            difficulty = %difficulty,
            is_correct,
            mastery = block_mastery,
            "answer recorded"
        );

        let previous_difficulty = self.adaptive.current_difficulty();
        let (adaptive, difficulty_change) = self.next_adaptive_state(is_correct, signals);
        self.adaptive = adaptive;
        self.block_difficulties[self.state.current_block_index()] =
            self.adaptive.current_difficulty();
        if difficulty_change != DifficultyChange::Unchanged {
            debug!(
                from = %previous_difficulty,
                to = %self.adaptive.current_difficulty(),
                change = ?difficulty_change,
                "difficulty changed"
            );
            self.on_trigger(ShownIdsResetTrigger::DifficultyChange);
        }

        let previous_index = self.state.current_block_index();
        let outcome = process_question_completion(&self.state, now);
        let block_completed = self.apply_completion(outcome, previous_index, now);

        Ok(AnswerOutcome {
            question_id: served.question_id,
            difficulty,
            is_correct,
            block_mastery,
            difficulty_change,
            next_difficulty: self.adaptive.current_difficulty(),
            block_completed,
            new_block_index: self.state.current_block_index(),
            session_complete: self.is_complete(),
        })
    }

    /// Complete the current block on the learner's request, whatever its mastery.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is complete.
    pub fn request_advance(&mut self, now: DateTime<Utc>) -> Result<AdvanceOutcome, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let previous_index = self.state.current_block_index();
        let completed_block = self.current_block_id().clone();

        let advanced = mark_manual_advance(self.state.current_block(), now);
        self.state = self.state.with_current_block(advanced)?;
        info!(lesson = %self.lesson_template_id, block_id = %completed_block, "manual advance requested");

        self.current = None;
        let outcome = process_question_completion(&self.state, now);
        self.apply_completion(outcome, previous_index, now);

        Ok(AdvanceOutcome {
            completed_block,
            new_block_index: self.state.current_block_index(),
            session_complete: self.is_complete(),
        })
    }

    /// Presentation view; the only place mastery is turned into a percentage.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            current_block_id: self.current_block_id().clone(),
            current_block_index: self.state.current_block_index(),
            total_blocks: self.state.total_blocks(),
            completed_blocks: self.state.completed_blocks(),
            current_difficulty: self.adaptive.current_difficulty(),
            block_mastery_percent: mastery_to_percent(self.state.overall_mastery()),
            mean_mastery_percent: mastery_to_percent(calculate_overall_mastery(
                self.state.blocks_progress(),
            )),
            questions_answered: self.questions_answered,
            is_last_block: self.state.is_last_block(),
            is_complete: self.is_complete(),
            block_completion: check_block_completion(self.state.current_block()),
        }
    }

    /// The fragment a storage collaborator persists for later resume.
    #[must_use]
    pub fn snapshot(&self) -> StoredSession {
        let blocks_progress = self
            .state
            .blocks_progress()
            .iter()
            .zip(&self.block_difficulties)
            .map(|(block, difficulty)| StoredBlockProgress {
                block_id: block.block_id().to_string(),
                mastery_score: Some(block.mastery_score()),
                is_complete: block.is_complete(),
                completed_at: block.completed_at(),
                student_requested_advance: block.student_requested_advance(),
                current_difficulty: Some(difficulty.as_str().to_owned()),
                questions_attempted: Some(block.questions_attempted().clone()),
                questions_correct: Some(block.questions_correct().clone()),
            })
            .collect();

        StoredSession {
            status: if self.is_complete() {
                SessionStatus::Completed
            } else {
                SessionStatus::Active
            },
            current_block_index: i64::try_from(self.state.current_block_index())
                .unwrap_or(i64::MAX),
            blocks_progress,
            difficulty_mode: Some(DifficultyMode::Adaptive),
            fixed_difficulty: None,
        }
    }

    fn next_adaptive_state(
        &self,
        is_correct: bool,
        signals: &AnswerSignals,
    ) -> (EnhancedAdaptiveState, DifficultyChange) {
        let recorded = self.adaptive.record(is_correct, signals);
        let config = self.settings.adaptive_config();

        if self.settings.confidence_weighting() {
            let decision = calculate_enhanced_adaptive_difficulty(&recorded, &config);
            return (decision.state, decision.change);
        }

        let config = calculate_personalized_thresholds(recorded.student_history.as_ref(), &config);
        let decision = calculate_adaptive_difficulty(&recorded.base, &config);
        let state = match decision.change {
            DifficultyChange::Unchanged => recorded,
            DifficultyChange::Upgraded | DifficultyChange::Downgraded => {
                recorded.reset_to(decision.state.current_difficulty)
            }
        };
        (state, decision.change)
    }

    /// Returns whether the block at `previous_index` completed.
    fn apply_completion(
        &mut self,
        outcome: QuestionCompletionOutcome,
        previous_index: usize,
        now: DateTime<Utc>,
    ) -> bool {
        self.state = outcome.updated_state;

        if outcome.should_progress {
            info!(
                lesson = %self.lesson_template_id,
                block_index = previous_index,
                block_id = %self.state.blocks_progress()[previous_index].block_id(),
                completed_blocks = self.state.completed_blocks(),
                "block completed"
            );
        }

        if outcome.new_block_index != previous_index {
            // Difficulty and per-block tracking restart on a new block; shown ids carry over.
            self.current = None;
            self.adaptive = self.adaptive.reset_to(Difficulty::Easy);
            self.block_difficulties[outcome.new_block_index] = Difficulty::Easy;
            self.tracking = QuestionTracking::default();
            self.on_trigger(ShownIdsResetTrigger::BlockChange);
        }

        if outcome.session_complete && self.completed_at.is_none() {
            self.completed_at = Some(now);
            self.current = None;
            info!(
                lesson = %self.lesson_template_id,
                questions_answered = self.questions_answered,
                "session completed"
            );
        }

        outcome.should_progress
    }

    fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.adaptive = self.adaptive.reset_to(difficulty);
        self.block_difficulties[self.state.current_block_index()] = difficulty;
        self.on_trigger(ShownIdsResetTrigger::DifficultyChange);
    }

    fn remember_shown(
        &mut self,
        difficulty: Difficulty,
        selection: &QuestionSelection,
        candidates: &[QuestionId],
    ) {
        let shown = &mut self.shown_ids[difficulty];
        if selection.pool_reset {
            shown.retain(|id| !candidates.contains(id));
        }
        if !shown.contains(&selection.question_id) {
            shown.push(selection.question_id.clone());
        }
    }

    fn on_trigger(&mut self, trigger: ShownIdsResetTrigger) {
        if should_reset_shown_ids(trigger) {
            self.shown_ids = PerDifficulty::default();
        }
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("lesson_template_id", &self.lesson_template_id)
            .field("current_block_index", &self.state.current_block_index())
            .field("total_blocks", &self.state.total_blocks())
            .field("difficulty", &self.adaptive.current_difficulty())
            .field("current", &self.current)
            .field("questions_answered", &self.questions_answered)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
