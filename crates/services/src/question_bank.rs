use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use practice_core::model::{
    BlockAvailability, BlockId, Difficulty, LessonTemplateId, PerDifficulty,
    QuestionAvailability, QuestionId, QuestionRequest,
};

use crate::error::QuestionBankError;

/// Content collaborator that owns the questions of each lesson.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Per-block and per-difficulty question counts for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::LessonNotFound` if the lesson is unknown.
    async fn availability(
        &self,
        lesson: &LessonTemplateId,
    ) -> Result<QuestionAvailability, QuestionBankError>;

    /// Every question id for the request's lesson, block and difficulty.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` if the lesson or block is unknown.
    async fn question_ids(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<QuestionId>, QuestionBankError>;
}

#[derive(Debug, Clone, Default)]
struct LessonEntry {
    blocks: Vec<(BlockId, String)>,
    questions: HashMap<BlockId, PerDifficulty<Vec<QuestionId>>>,
}

/// Simple in-memory bank for tests and the simulator.
#[derive(Clone, Default)]
pub struct InMemoryQuestionBank {
    lessons: Arc<Mutex<HashMap<LessonTemplateId, LessonEntry>>>,
}

impl InMemoryQuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block to a lesson, creating the lesson if needed.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::Connection` if the lock is poisoned.
    pub fn add_block(
        &self,
        lesson: &LessonTemplateId,
        block: &BlockId,
        title: impl Into<String>,
    ) -> Result<(), QuestionBankError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| QuestionBankError::Connection(e.to_string()))?;
        let entry = guard.entry(lesson.clone()).or_default();
        if !entry.blocks.iter().any(|(id, _)| id == block) {
            entry.blocks.push((block.clone(), title.into()));
            entry.questions.insert(block.clone(), PerDifficulty::default());
        }
        Ok(())
    }

    /// Add a question to an existing block.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` if the lesson or block has not been added.
    pub fn add_question(
        &self,
        lesson: &LessonTemplateId,
        block: &BlockId,
        difficulty: Difficulty,
        question: QuestionId,
    ) -> Result<(), QuestionBankError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| QuestionBankError::Connection(e.to_string()))?;
        let entry = guard
            .get_mut(lesson)
            .ok_or_else(|| QuestionBankError::LessonNotFound(lesson.clone()))?;
        let pools = entry
            .questions
            .get_mut(block)
            .ok_or_else(|| QuestionBankError::UnknownBlock {
                lesson: lesson.clone(),
                block: block.clone(),
            })?;
        if !pools[difficulty].contains(&question) {
            pools[difficulty].push(question);
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn availability(
        &self,
        lesson: &LessonTemplateId,
    ) -> Result<QuestionAvailability, QuestionBankError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| QuestionBankError::Connection(e.to_string()))?;
        let entry = guard
            .get(lesson)
            .ok_or_else(|| QuestionBankError::LessonNotFound(lesson.clone()))?;

        let mut by_difficulty = PerDifficulty::<u32>::default();
        let mut by_block = Vec::with_capacity(entry.blocks.len());
        for (block_id, title) in &entry.blocks {
            let pools = entry.questions.get(block_id).cloned().unwrap_or_default();
            let mut count = 0u32;
            for (difficulty, ids) in pools.iter() {
                let n = u32::try_from(ids.len()).unwrap_or(u32::MAX);
                by_difficulty[difficulty] = by_difficulty[difficulty].saturating_add(n);
                count = count.saturating_add(n);
            }
            by_block.push(BlockAvailability {
                block_id: block_id.clone(),
                block_title: title.clone(),
                count,
            });
        }

        let total_count = by_difficulty.total();
        Ok(QuestionAvailability {
            lesson_template_id: lesson.clone(),
            has_questions: total_count > 0,
            total_count,
            by_difficulty,
            by_block,
        })
    }

    async fn question_ids(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<QuestionId>, QuestionBankError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| QuestionBankError::Connection(e.to_string()))?;
        let lesson = request.lesson_template_id();
        let entry = guard
            .get(lesson)
            .ok_or_else(|| QuestionBankError::LessonNotFound(lesson.clone()))?;
        let pools =
            entry
                .questions
                .get(request.block_id())
                .ok_or_else(|| QuestionBankError::UnknownBlock {
                    lesson: lesson.clone(),
                    block: request.block_id().clone(),
                })?;
        Ok(pools[request.difficulty()].clone())
    }
}
