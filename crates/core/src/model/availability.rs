use serde::{Deserialize, Serialize};

use crate::model::difficulty::PerDifficulty;
use crate::model::ids::{BlockId, LessonTemplateId};

/// Question count for one block of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAvailability {
    pub block_id: BlockId,
    #[serde(default)]
    pub block_title: String,
    pub count: u32,
}

/// What the question bank holds for a lesson template.
///
/// Supplied by the content collaborator; `by_block` order is the block order
/// of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAvailability {
    pub lesson_template_id: LessonTemplateId,
    pub has_questions: bool,
    pub total_count: u32,
    #[serde(default)]
    pub by_difficulty: PerDifficulty<u32>,
    #[serde(default)]
    pub by_block: Vec<BlockAvailability>,
}

impl QuestionAvailability {
    /// Block ids in session order.
    #[must_use]
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.by_block.iter().map(|b| b.block_id.clone()).collect()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.by_block.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_collaborator_payload() {
        let json = r#"{
            "lessonTemplateId": "lesson-1",
            "hasQuestions": true,
            "totalCount": 12,
            "byDifficulty": {"easy": 5, "medium": 4, "hard": 3},
            "byBlock": [
                {"blockId": "b1", "blockTitle": "Fractions", "count": 7},
                {"blockId": "b2", "blockTitle": "Decimals", "count": 5}
            ]
        }"#;
        let availability: QuestionAvailability = serde_json::from_str(json).unwrap();
        assert_eq!(availability.block_count(), 2);
        assert_eq!(availability.by_difficulty.hard, 3);
        assert_eq!(availability.block_ids()[1].as_str(), "b2");
    }
}
