//! Sheet aggregate and its owned nodes.
//!
//! # Responsibility
//! - Define `Sheet`, `Topic`, `SubTopic` and `Question` records.
//! - Normalize difficulty/status labels instead of rejecting them.
//! - Validate a whole tree for strict replace flows.
//!
//! # Invariants
//! - `Sheet::slug` is immutable after creation.
//! - Sibling `order` values are `0..n-1` after every service mutation.
//! - Topic, sub-topic and question ids are unique sheet-wide.
//!
//! # See also
//! - `crate::order::siblings` for the order invariant.

use crate::order::siblings::{is_dense, Ordered};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SheetId = String;
pub type TopicId = String;
pub type SubTopicId = String;
pub type QuestionId = String;

/// Hierarchy level of one node. Used in errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Sheet,
    Topic,
    SubTopic,
    Question,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sheet => "sheet",
            Self::Topic => "topic",
            Self::SubTopic => "subtopic",
            Self::Question => "question",
        }
    }
}

/// Errors raised when a node or tree violates model invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Title is blank after trim.
    EmptyTitle(NodeKind),
    /// Sheet slug is blank after trim.
    EmptySlug,
    /// The same id appears twice within its sheet-wide scope.
    DuplicateId { kind: NodeKind, id: String },
    /// Sibling `order` values are not exactly `0..n-1`.
    OrderNotDense {
        kind: NodeKind,
        parent_id: Option<String>,
    },
    /// A replacement tree tried to change the immutable slug.
    SlugChanged { expected: String, actual: String },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle(kind) => write!(f, "{} title must not be blank", kind.as_str()),
            Self::EmptySlug => write!(f, "sheet slug must not be blank"),
            Self::DuplicateId { kind, id } => {
                write!(f, "duplicate {} id: {id}", kind.as_str())
            }
            Self::OrderNotDense {
                kind,
                parent_id: Some(parent_id),
            } => write!(
                f,
                "{} order values under `{parent_id}` are not contiguous from 0",
                kind.as_str()
            ),
            Self::OrderNotDense {
                kind,
                parent_id: None,
            } => write!(
                f,
                "{} order values are not contiguous from 0",
                kind.as_str()
            ),
            Self::SlugChanged { expected, actual } => {
                write!(f, "sheet slug is immutable: expected `{expected}`, got `{actual}`")
            }
        }
    }
}

impl Error for ModelValidationError {}

/// Question difficulty. Unknown labels normalize to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Parses a label, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match fold_label(value).as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Parses a label, falling back to the default for unknown input.
    pub fn normalize(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl From<String> for Difficulty {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Practice progress of one question. Absent or unknown labels normalize to
/// `NotStarted`, which also covers legacy records without a status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum QuestionStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Solved")]
    Solved,
}

impl QuestionStatus {
    pub const ALL: [QuestionStatus; 3] = [Self::NotStarted, Self::InProgress, Self::Solved];

    /// Parses a label. Accepts `Not Started`, `not_started` and `not-started`.
    pub fn parse(value: &str) -> Option<Self> {
        match fold_label(value).as_str() {
            "notstarted" => Some(Self::NotStarted),
            "inprogress" => Some(Self::InProgress),
            "solved" => Some(Self::Solved),
            _ => None,
        }
    }

    pub fn normalize(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// Next status in the `Not Started -> In Progress -> Solved` cycle.
    pub fn next(self) -> Self {
        match self {
            Self::NotStarted => Self::InProgress,
            Self::InProgress => Self::Solved,
            Self::Solved => Self::NotStarted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Solved => "Solved",
        }
    }
}

impl From<String> for QuestionStatus {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

impl Display for QuestionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns whether `value` names a known difficulty.
pub fn is_valid_difficulty(value: &str) -> bool {
    Difficulty::parse(value).is_some()
}

/// Returns whether `value` names a known question status.
pub fn is_valid_status(value: &str) -> bool {
    QuestionStatus::parse(value).is_some()
}

/// Returns whether `value` is a usable title.
pub fn is_non_empty_title(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Trims a title and rejects it when blank.
pub fn normalize_title(value: &str, kind: NodeKind) -> Result<String, ModelValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelValidationError::EmptyTitle(kind));
    }
    Ok(trimmed.to_string())
}

/// Generates a fresh id of the form `<prefix>-<uuid>`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Root aggregate holding the ordered topic list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: SheetId,
    pub title: String,
    /// External identifier. Immutable after creation.
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topics: Vec<Topic>,
}

impl Sheet {
    /// Creates an empty sheet with a generated id.
    pub fn new(title: &str, slug: &str) -> Result<Self, ModelValidationError> {
        Self::with_id(generate_id("sheet"), title, slug)
    }

    /// Creates an empty sheet with a caller-provided id.
    pub fn with_id(
        id: impl Into<SheetId>,
        title: &str,
        slug: &str,
    ) -> Result<Self, ModelValidationError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(ModelValidationError::EmptySlug);
        }
        Ok(Self {
            id: id.into(),
            title: normalize_title(title, NodeKind::Sheet)?,
            slug: slug.to_string(),
            topics: Vec::new(),
        })
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }

    pub fn topic_mut(&mut self, topic_id: &str) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|topic| topic.id == topic_id)
    }

    /// Iterates every question in tree order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.topics.iter().flat_map(Topic::questions)
    }

    pub fn question_count(&self) -> usize {
        self.questions().count()
    }

    /// Checks every tree invariant: titles, sheet-wide id uniqueness and
    /// dense sibling orders at each level.
    ///
    /// Service mutations keep these by construction; this is for trees that
    /// arrive from outside (imports, strict replace).
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.slug.trim().is_empty() {
            return Err(ModelValidationError::EmptySlug);
        }
        if !is_dense(&self.topics) {
            return Err(ModelValidationError::OrderNotDense {
                kind: NodeKind::Topic,
                parent_id: None,
            });
        }

        let mut topic_ids = HashSet::new();
        let mut subtopic_ids = HashSet::new();
        let mut question_ids = HashSet::new();
        for topic in &self.topics {
            check_node(NodeKind::Topic, &topic.id, &topic.title, &mut topic_ids)?;
            if !is_dense(&topic.sub_topics) {
                return Err(ModelValidationError::OrderNotDense {
                    kind: NodeKind::SubTopic,
                    parent_id: Some(topic.id.clone()),
                });
            }
            for sub_topic in &topic.sub_topics {
                check_node(
                    NodeKind::SubTopic,
                    &sub_topic.id,
                    &sub_topic.title,
                    &mut subtopic_ids,
                )?;
                if !is_dense(&sub_topic.questions) {
                    return Err(ModelValidationError::OrderNotDense {
                        kind: NodeKind::Question,
                        parent_id: Some(sub_topic.id.clone()),
                    });
                }
                for question in &sub_topic.questions {
                    check_node(
                        NodeKind::Question,
                        &question.id,
                        &question.title,
                        &mut question_ids,
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn check_node<'a>(
    kind: NodeKind,
    id: &'a str,
    title: &str,
    seen: &mut HashSet<&'a str>,
) -> Result<(), ModelValidationError> {
    if !is_non_empty_title(title) {
        return Err(ModelValidationError::EmptyTitle(kind));
    }
    if !seen.insert(id) {
        return Err(ModelValidationError::DuplicateId {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Top-level grouping owned by the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_topics: Vec<SubTopic>,
}

impl Topic {
    /// Creates a topic with a generated id. `order` is assigned on insert.
    pub fn new(title: &str) -> Result<Self, ModelValidationError> {
        Self::with_id(generate_id("topic"), title)
    }

    pub fn with_id(id: impl Into<TopicId>, title: &str) -> Result<Self, ModelValidationError> {
        Ok(Self {
            id: id.into(),
            title: normalize_title(title, NodeKind::Topic)?,
            order: 0,
            sub_topics: Vec::new(),
        })
    }

    pub fn sub_topic(&self, subtopic_id: &str) -> Option<&SubTopic> {
        self.sub_topics.iter().find(|item| item.id == subtopic_id)
    }

    pub fn sub_topic_mut(&mut self, subtopic_id: &str) -> Option<&mut SubTopic> {
        self.sub_topics.iter_mut().find(|item| item.id == subtopic_id)
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sub_topics.iter().flat_map(|item| item.questions.iter())
    }
}

/// Second-level grouping owned by one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTopic {
    pub id: SubTopicId,
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
}

impl SubTopic {
    pub fn new(title: &str) -> Result<Self, ModelValidationError> {
        Self::with_id(generate_id("subtopic"), title)
    }

    pub fn with_id(
        id: impl Into<SubTopicId>,
        title: &str,
    ) -> Result<Self, ModelValidationError> {
        Ok(Self {
            id: id.into(),
            title: normalize_title(title, NodeKind::SubTopic)?,
            order: 0,
            questions: Vec::new(),
        })
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|item| item.id == question_id)
    }

    pub fn question_mut(&mut self, question_id: &str) -> Option<&mut Question> {
        self.questions.iter_mut().find(|item| item.id == question_id)
    }
}

/// One practice item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    /// Problem URL. Empty string means "no link".
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: QuestionStatus,
    #[serde(default)]
    pub order: u32,
}

impl Question {
    /// Creates a question with safe defaults: empty link, `Medium`,
    /// `Not Started`.
    pub fn new(title: &str) -> Result<Self, ModelValidationError> {
        Self::with_id(generate_id("q"), title)
    }

    pub fn with_id(
        id: impl Into<QuestionId>,
        title: &str,
    ) -> Result<Self, ModelValidationError> {
        Ok(Self {
            id: id.into(),
            title: normalize_title(title, NodeKind::Question)?,
            link: String::new(),
            difficulty: Difficulty::default(),
            status: QuestionStatus::default(),
            order: 0,
        })
    }
}

macro_rules! impl_ordered {
    ($($node:ty),+) => {
        $(
            impl Ordered for $node {
                fn id(&self) -> &str {
                    &self.id
                }

                fn order(&self) -> u32 {
                    self.order
                }

                fn set_order(&mut self, order: u32) {
                    self.order = order;
                }
            }
        )+
    };
}

impl_ordered!(Topic, SubTopic, Question);

/// Treats an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn fold_label(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_reject_blank_titles() {
        assert_eq!(
            Topic::new("   ").unwrap_err(),
            ModelValidationError::EmptyTitle(NodeKind::Topic)
        );
        assert_eq!(
            Question::new("").unwrap_err(),
            ModelValidationError::EmptyTitle(NodeKind::Question)
        );
        assert_eq!(
            Sheet::new("Sheet", " ").unwrap_err(),
            ModelValidationError::EmptySlug
        );
    }

    #[test]
    fn question_defaults_are_safe() {
        let question = Question::new("  Two Sum ").unwrap();
        assert_eq!(question.title, "Two Sum");
        assert_eq!(question.link, "");
        assert_eq!(question.difficulty, Difficulty::Medium);
        assert_eq!(question.status, QuestionStatus::NotStarted);
        assert!(question.id.starts_with("q-"));
    }

    #[test]
    fn labels_normalize_instead_of_failing() {
        assert_eq!(Difficulty::normalize(" HARD "), Difficulty::Hard);
        assert_eq!(Difficulty::normalize("brutal"), Difficulty::Medium);
        assert_eq!(QuestionStatus::normalize("in_progress"), QuestionStatus::InProgress);
        assert_eq!(QuestionStatus::normalize("???"), QuestionStatus::NotStarted);
        assert!(is_valid_status("Not Started"));
        assert!(!is_valid_difficulty("Extreme"));
        assert!(!is_non_empty_title(" \t"));
    }

    #[test]
    fn status_cycles_through_all_states() {
        let mut status = QuestionStatus::NotStarted;
        let mut seen = Vec::new();
        for _ in 0..3 {
            status = status.next();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                QuestionStatus::InProgress,
                QuestionStatus::Solved,
                QuestionStatus::NotStarted
            ]
        );
    }

    #[test]
    fn legacy_question_without_status_deserializes_as_not_started() {
        let question: Question = serde_json::from_str(
            r#"{"id":"q-1","title":"Rotate Image","difficulty":"Hard","order":0}"#,
        )
        .unwrap();
        assert_eq!(question.status, QuestionStatus::NotStarted);
        assert_eq!(question.difficulty, Difficulty::Hard);
        assert_eq!(question.link, "");

        let nulls: Question = serde_json::from_str(
            r#"{"id":"q-2","title":"x","link":null,"difficulty":null,"status":null}"#,
        )
        .unwrap();
        assert_eq!(nulls.status, QuestionStatus::NotStarted);
        assert_eq!(nulls.difficulty, Difficulty::Medium);
    }

    #[test]
    fn serializes_with_external_field_names() {
        let mut topic = Topic::with_id("topic-1", "Arrays").unwrap();
        let mut question = Question::with_id("q-1", "Set Matrix Zeroes").unwrap();
        question.status = QuestionStatus::InProgress;
        let mut sub_topic = SubTopic::with_id("subtopic-1", "Easy").unwrap();
        sub_topic.questions.push(question);
        topic.sub_topics.push(sub_topic);

        let value = serde_json::to_value(&topic).unwrap();
        assert_eq!(value["subTopics"][0]["questions"][0]["status"], "In Progress");
        assert_eq!(value["subTopics"][0]["questions"][0]["difficulty"], "Medium");
    }

    #[test]
    fn validate_reports_duplicate_subtopic_ids_across_topics() {
        let mut sheet = Sheet::with_id("1", "Sheet", "sheet").unwrap();
        for (index, topic_id) in ["t-1", "t-2"].into_iter().enumerate() {
            let mut topic = Topic::with_id(topic_id, "T").unwrap();
            topic.order = index as u32;
            topic.sub_topics.push(SubTopic::with_id("st-shared", "S").unwrap());
            sheet.topics.push(topic);
        }

        assert_eq!(
            sheet.validate().unwrap_err(),
            ModelValidationError::DuplicateId {
                kind: NodeKind::SubTopic,
                id: "st-shared".to_string()
            }
        );
    }

    #[test]
    fn validate_reports_order_gaps() {
        let mut sheet = Sheet::with_id("1", "Sheet", "sheet").unwrap();
        let mut topic = Topic::with_id("t-1", "T").unwrap();
        topic.order = 1;
        sheet.topics.push(topic);

        assert!(matches!(
            sheet.validate().unwrap_err(),
            ModelValidationError::OrderNotDense {
                kind: NodeKind::Topic,
                parent_id: None
            }
        ));
    }
}
