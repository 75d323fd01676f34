//! Mutation requests and their confirmed outcomes.
//!
//! A `SheetMutation` is what a caller asks for; a `MutationOutcome` is what
//! the authoritative service confirms. The sync projection folds outcomes,
//! never requests.

use crate::model::sheet::{
    Question, QuestionId, Sheet, SubTopic, SubTopicId, Topic, TopicId,
};
use serde::{Deserialize, Serialize};

/// Input for creating a question. Omitted fields take model defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl QuestionDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial question update.
///
/// `None` and empty strings mean "not provided" for `title`, `difficulty`
/// and `status`. `link` is different: `Some("")` clears the link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// How `replace_sheet_with` and `reorder_with` treat an incoming tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// Store the tree verbatim. The caller guarantees ids and orders.
    #[default]
    Trusting,
    /// Validate before storing. Replace checks titles, id uniqueness, order
    /// density and slug; reorder checks that every sibling set is a
    /// permutation of the current one.
    Strict,
}

/// One requested change to the authoritative sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SheetMutation {
    ReplaceSheet {
        sheet: Sheet,
        #[serde(default)]
        mode: ReplaceMode,
    },
    AddTopic {
        title: String,
    },
    RenameTopic {
        topic_id: TopicId,
        title: String,
    },
    DeleteTopic {
        topic_id: TopicId,
    },
    MoveTopic {
        topic_id: TopicId,
        to: usize,
    },
    AddSubTopic {
        topic_id: TopicId,
        title: String,
    },
    RenameSubTopic {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        title: String,
    },
    DeleteSubTopic {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
    },
    MoveSubTopic {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        to: usize,
    },
    AddQuestion {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        draft: QuestionDraft,
    },
    UpdateQuestion {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question_id: QuestionId,
        patch: QuestionPatch,
    },
    CycleQuestionStatus {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question_id: QuestionId,
    },
    DeleteQuestion {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question_id: QuestionId,
    },
    MoveQuestion {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question_id: QuestionId,
        to: usize,
    },
    Reorder {
        topics: Vec<Topic>,
        #[serde(default)]
        mode: ReplaceMode,
    },
}

impl SheetMutation {
    /// Stable operation name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReplaceSheet { .. } => "replace_sheet",
            Self::AddTopic { .. } => "add_topic",
            Self::RenameTopic { .. } => "rename_topic",
            Self::DeleteTopic { .. } => "delete_topic",
            Self::MoveTopic { .. } => "move_topic",
            Self::AddSubTopic { .. } => "add_subtopic",
            Self::RenameSubTopic { .. } => "rename_subtopic",
            Self::DeleteSubTopic { .. } => "delete_subtopic",
            Self::MoveSubTopic { .. } => "move_subtopic",
            Self::AddQuestion { .. } => "add_question",
            Self::UpdateQuestion { .. } => "update_question",
            Self::CycleQuestionStatus { .. } => "cycle_question_status",
            Self::DeleteQuestion { .. } => "delete_question",
            Self::MoveQuestion { .. } => "move_question",
            Self::Reorder { .. } => "reorder",
        }
    }

    /// Returns whether `outcome` is a legal confirmation of this request.
    pub fn accepts(&self, outcome: &MutationOutcome) -> bool {
        use MutationOutcome as O;
        matches!(
            (self, outcome),
            (Self::ReplaceSheet { .. }, O::SheetReplaced(_))
                | (Self::AddTopic { .. }, O::TopicAdded(_))
                | (Self::RenameTopic { .. }, O::TopicRenamed(_))
                | (Self::DeleteTopic { .. }, O::TopicDeleted { .. })
                | (Self::AddSubTopic { .. }, O::SubTopicAdded { .. })
                | (Self::RenameSubTopic { .. }, O::SubTopicRenamed { .. })
                | (Self::DeleteSubTopic { .. }, O::SubTopicDeleted { .. })
                | (Self::AddQuestion { .. }, O::QuestionAdded { .. })
                | (Self::UpdateQuestion { .. }, O::QuestionUpdated { .. })
                | (Self::CycleQuestionStatus { .. }, O::QuestionUpdated { .. })
                | (Self::DeleteQuestion { .. }, O::QuestionDeleted { .. })
                | (
                    Self::MoveTopic { .. }
                        | Self::MoveSubTopic { .. }
                        | Self::MoveQuestion { .. }
                        | Self::Reorder { .. },
                    O::Reordered(_)
                )
        )
    }
}

/// Server-confirmed result of one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MutationOutcome {
    SheetReplaced(Sheet),
    TopicAdded(Topic),
    TopicRenamed(Topic),
    TopicDeleted {
        topic_id: TopicId,
    },
    SubTopicAdded {
        topic_id: TopicId,
        sub_topic: SubTopic,
    },
    SubTopicRenamed {
        topic_id: TopicId,
        sub_topic: SubTopic,
    },
    SubTopicDeleted {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
    },
    QuestionAdded {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question: Question,
    },
    QuestionUpdated {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question: Question,
    },
    QuestionDeleted {
        topic_id: TopicId,
        subtopic_id: SubTopicId,
        question_id: QuestionId,
    },
    /// Whole sheet after a reorder or move at any level.
    Reordered(Sheet),
}

#[cfg(test)]
mod tests {
    use super::{MutationOutcome, QuestionPatch, SheetMutation};
    use crate::model::sheet::Topic;

    #[test]
    fn patch_distinguishes_empty_link_from_missing_link() {
        let cleared: QuestionPatch = serde_json::from_str(r#"{"link":""}"#).unwrap();
        assert_eq!(cleared.link.as_deref(), Some(""));
        assert_eq!(cleared.title, None);

        let untouched: QuestionPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.link, None);
    }

    #[test]
    fn mutation_is_tagged_by_op() {
        let mutation: SheetMutation =
            serde_json::from_str(r#"{"op":"move_topic","topic_id":"topic-1","to":2}"#).unwrap();
        assert_eq!(
            mutation,
            SheetMutation::MoveTopic {
                topic_id: "topic-1".to_string(),
                to: 2
            }
        );
        assert_eq!(mutation.name(), "move_topic");
    }

    #[test]
    fn accepts_only_matching_outcomes() {
        let add = SheetMutation::AddTopic {
            title: "Arrays".to_string(),
        };
        let topic = Topic::with_id("topic-1", "Arrays").unwrap();
        assert!(add.accepts(&MutationOutcome::TopicAdded(topic.clone())));
        assert!(!add.accepts(&MutationOutcome::TopicRenamed(topic)));
        assert!(!add.accepts(&MutationOutcome::TopicDeleted {
            topic_id: "topic-1".to_string()
        }));
    }
}
