//! Read-only progress summaries over one sheet.

use crate::model::sheet::{Difficulty, QuestionStatus, Sheet, TopicId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetStats {
    pub total: usize,
    pub solved: usize,
    /// Share of solved questions, `0.0` for an empty sheet.
    pub solved_percent: f64,
    /// One entry per difficulty, `Easy` first.
    pub by_difficulty: Vec<DifficultyCount>,
    /// One entry per status, `Not Started` first.
    pub by_status: Vec<StatusCount>,
    /// Topics in sheet order.
    pub per_topic: Vec<TopicCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifficultyCount {
    pub difficulty: Difficulty,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: QuestionStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCount {
    pub topic_id: TopicId,
    pub title: String,
    pub total: usize,
    pub solved: usize,
}

impl SheetStats {
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let by_difficulty = Difficulty::ALL
            .into_iter()
            .map(|difficulty| DifficultyCount {
                difficulty,
                count: sheet
                    .questions()
                    .filter(|question| question.difficulty == difficulty)
                    .count(),
            })
            .collect();
        let by_status: Vec<StatusCount> = QuestionStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: sheet
                    .questions()
                    .filter(|question| question.status == status)
                    .count(),
            })
            .collect();
        let per_topic = sheet
            .topics
            .iter()
            .map(|topic| TopicCount {
                topic_id: topic.id.clone(),
                title: topic.title.clone(),
                total: topic.questions().count(),
                solved: topic
                    .questions()
                    .filter(|question| question.status == QuestionStatus::Solved)
                    .count(),
            })
            .collect();

        let total = sheet.question_count();
        let solved = by_status
            .iter()
            .find(|entry| entry.status == QuestionStatus::Solved)
            .map_or(0, |entry| entry.count);
        let solved_percent = if total == 0 {
            0.0
        } else {
            solved as f64 * 100.0 / total as f64
        };

        Self {
            total,
            solved,
            solved_percent,
            by_difficulty,
            by_status,
            per_topic,
        }
    }

    pub fn difficulty_count(&self, difficulty: Difficulty) -> usize {
        self.by_difficulty
            .iter()
            .find(|entry| entry.difficulty == difficulty)
            .map_or(0, |entry| entry.count)
    }
}

#[cfg(test)]
mod tests {
    use super::SheetStats;
    use crate::model::sheet::{Difficulty, Sheet};

    #[test]
    fn empty_sheet_has_zero_percent() {
        let sheet = Sheet::with_id("s", "Sheet", "sheet").unwrap();
        let stats = SheetStats::from_sheet(&sheet);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.solved_percent, 0.0);
        assert_eq!(stats.by_difficulty.len(), 3);
        assert_eq!(stats.difficulty_count(Difficulty::Hard), 0);
    }
}
