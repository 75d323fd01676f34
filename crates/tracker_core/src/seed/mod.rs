//! Initial sheet sources.
//!
//! # Responsibility
//! - Provide the built-in sample sheet.
//! - Group a flat question dataset into a topic/sub-topic tree.
//!
//! # Invariants
//! - Every produced tree has dense sibling orders and sheet-wide unique ids.
//! - `load_initial_sheet` never fails; unreadable datasets fall back to the
//!   sample with a logged warning.

use crate::model::sheet::{Difficulty, Question, QuestionStatus, Sheet, SubTopic, Topic};
use crate::order::siblings::append;
use log::{error, info, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const FALLBACK_SHEET_SLUG: &str = "striver-sde-sheet";

const DEFAULT_TOPIC: &str = "Misc";
const DEFAULT_SUBTOPIC: &str = "General";
const DEFAULT_QUESTION_TITLE: &str = "Untitled Question";
const DEFAULT_DATASET_SHEET_ID: &str = "1";
const DEFAULT_DATASET_TITLE: &str = "Striver Sheet";
const DEFAULT_DATASET_SLUG: &str = "striver-sheet";

#[derive(Debug)]
pub enum SeedError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read dataset `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid dataset json: {err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Dataset {
    #[serde(default)]
    data: Option<DatasetData>,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetData {
    #[serde(default)]
    sheet: Option<DatasetSheet>,
    #[serde(default)]
    questions: Option<Vec<DatasetQuestion>>,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetSheet {
    #[serde(rename = "_id")]
    id: Option<String>,
    name: Option<String>,
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetQuestion {
    topic: Option<String>,
    sub_topic: Option<String>,
    title: Option<String>,
    question_id: Option<DatasetQuestionMeta>,
    is_solved: Option<bool>,
    #[serde(rename = "_id")]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetQuestionMeta {
    name: Option<String>,
    difficulty: Option<String>,
    problem_url: Option<String>,
}

/// Built-in two-topic sample.
pub fn fallback_sheet() -> Sheet {
    let arrays = sample_topic(
        "topic-1",
        "Arrays",
        vec![
            (
                "subtopic-1",
                "Easy",
                vec![
                    (
                        "q-1",
                        "Set Matrix Zeroes",
                        "https://leetcode.com/problems/set-matrix-zeroes/",
                        Difficulty::Medium,
                    ),
                    (
                        "q-2",
                        "Pascal's Triangle",
                        "https://leetcode.com/problems/pascals-triangle/",
                        Difficulty::Easy,
                    ),
                ],
            ),
            (
                "subtopic-2",
                "Medium",
                vec![(
                    "q-3",
                    "Rotate Image",
                    "https://leetcode.com/problems/rotate-image/",
                    Difficulty::Medium,
                )],
            ),
        ],
    );
    let linked_list = sample_topic(
        "topic-2",
        "Linked List",
        vec![(
            "subtopic-3",
            "Easy",
            vec![(
                "q-4",
                "Reverse Linked List",
                "https://leetcode.com/problems/reverse-linked-list/",
                Difficulty::Easy,
            )],
        )],
    );

    let mut topics = Vec::with_capacity(2);
    append(&mut topics, arrays);
    append(&mut topics, linked_list);
    Sheet {
        id: "1".to_string(),
        title: "Striver SDE Sheet".to_string(),
        slug: FALLBACK_SHEET_SLUG.to_string(),
        topics,
    }
}

type SampleQuestion = (&'static str, &'static str, &'static str, Difficulty);

fn sample_topic(
    id: &str,
    title: &str,
    sub_topics: Vec<(&'static str, &'static str, Vec<SampleQuestion>)>,
) -> Topic {
    let mut topic = Topic {
        id: id.to_string(),
        title: title.to_string(),
        order: 0,
        sub_topics: Vec::new(),
    };
    for (sub_id, sub_title, questions) in sub_topics {
        let mut sub_topic = SubTopic {
            id: sub_id.to_string(),
            title: sub_title.to_string(),
            order: 0,
            questions: Vec::new(),
        };
        for (question_id, question_title, link, difficulty) in questions {
            append(
                &mut sub_topic.questions,
                Question {
                    id: question_id.to_string(),
                    title: question_title.to_string(),
                    link: link.to_string(),
                    difficulty,
                    status: QuestionStatus::NotStarted,
                    order: 0,
                },
            );
        }
        append(&mut topic.sub_topics, sub_topic);
    }
    topic
}

/// Builds a sheet from a flat question dataset.
///
/// Topics and sub-topics appear in first-seen order. Missing or blank names
/// fall back to `Misc`, `General` and `Untitled Question`. Questions without
/// `_id` get the first unused `<subtopic id>-q-<n>`; a repeated `_id` is
/// skipped.
pub fn sheet_from_dataset(json: &str) -> Result<Sheet, SeedError> {
    let dataset: Dataset = serde_json::from_str(json)?;
    let data = dataset.data.unwrap_or_default();
    let meta = data.sheet.unwrap_or_default();

    let mut topics: Vec<Topic> = Vec::new();
    let mut topic_index: HashMap<String, usize> = HashMap::new();
    let mut seen_question_ids: HashSet<String> = HashSet::new();
    let mut skipped = 0usize;

    for record in data.questions.unwrap_or_default() {
        let topic_title = non_blank(record.topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let subtopic_title =
            non_blank(record.sub_topic).unwrap_or_else(|| DEFAULT_SUBTOPIC.to_string());

        let position = match topic_index.get(&topic_title) {
            Some(position) => *position,
            None => {
                let topic = Topic {
                    id: format!("topic-{}", topics.len() + 1),
                    title: topic_title.clone(),
                    order: 0,
                    sub_topics: Vec::new(),
                };
                append(&mut topics, topic);
                topic_index.insert(topic_title, topics.len() - 1);
                topics.len() - 1
            }
        };
        let topic = &mut topics[position];

        let sub_position = match topic
            .sub_topics
            .iter()
            .position(|sub_topic| sub_topic.title == subtopic_title)
        {
            Some(sub_position) => sub_position,
            None => {
                let sub_topic = SubTopic {
                    id: format!("subtopic-{}-{}", topic.id, topic.sub_topics.len() + 1),
                    title: subtopic_title,
                    order: 0,
                    questions: Vec::new(),
                };
                append(&mut topic.sub_topics, sub_topic);
                topic.sub_topics.len() - 1
            }
        };
        let sub_topic = &mut topic.sub_topics[sub_position];

        let question_meta = record.question_id.unwrap_or_default();
        let id = match non_blank(record.id) {
            Some(id) => {
                if !seen_question_ids.insert(id.clone()) {
                    skipped += 1;
                    continue;
                }
                id
            }
            None => generated_question_id(
                &sub_topic.id,
                sub_topic.questions.len() + 1,
                &mut seen_question_ids,
            ),
        };
        let question = Question {
            id,
            title: non_blank(record.title)
                .or_else(|| non_blank(question_meta.name))
                .unwrap_or_else(|| DEFAULT_QUESTION_TITLE.to_string()),
            link: question_meta
                .problem_url
                .map(|url| url.trim().to_string())
                .unwrap_or_default(),
            difficulty: non_blank(question_meta.difficulty)
                .map(|label| Difficulty::normalize(&label))
                .unwrap_or_default(),
            status: if record.is_solved.unwrap_or(false) {
                QuestionStatus::Solved
            } else {
                QuestionStatus::NotStarted
            },
            order: 0,
        };
        append(&mut sub_topic.questions, question);
    }

    if skipped > 0 {
        warn!("event=seed_dataset module=seed status=ok skipped_duplicates={skipped}");
    }

    Ok(Sheet {
        id: non_blank(meta.id).unwrap_or_else(|| DEFAULT_DATASET_SHEET_ID.to_string()),
        title: non_blank(meta.name).unwrap_or_else(|| DEFAULT_DATASET_TITLE.to_string()),
        slug: non_blank(meta.slug).unwrap_or_else(|| DEFAULT_DATASET_SLUG.to_string()),
        topics,
    })
}

/// Reads and converts a dataset file.
pub fn read_dataset(path: &Path) -> Result<Sheet, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    sheet_from_dataset(&raw)
}

/// Returns the dataset sheet at `path`, or the fallback sample when the path
/// is absent, missing or unreadable.
pub fn load_initial_sheet(path: Option<&Path>) -> Sheet {
    let Some(path) = path.filter(|path| path.exists()) else {
        warn!("event=seed_load module=seed status=ok source=fallback reason=dataset_missing");
        return fallback_sheet();
    };

    match read_dataset(path) {
        Ok(sheet) => {
            info!(
                "event=seed_load module=seed status=ok source=dataset topics={} questions={}",
                sheet.topics.len(),
                sheet.question_count()
            );
            sheet
        }
        Err(err) => {
            error!("event=seed_load module=seed status=error source=fallback error={err}");
            fallback_sheet()
        }
    }
}

/// First free `<subtopic id>-q-<n>` at or after `start`; the id is reserved.
fn generated_question_id(subtopic_id: &str, start: usize, seen: &mut HashSet<String>) -> String {
    let mut n = start;
    loop {
        let candidate = format!("{subtopic_id}-q-{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_sheet_is_valid() {
        let sheet = fallback_sheet();
        sheet.validate().unwrap();
        assert_eq!(sheet.slug, FALLBACK_SHEET_SLUG);
        assert_eq!(sheet.question_count(), 4);
        assert_eq!(sheet.topics[1].title, "Linked List");
        assert_eq!(sheet.topics[0].sub_topics[1].order, 1);
    }

    #[test]
    fn missing_dataset_path_uses_fallback() {
        let sheet = load_initial_sheet(Some(Path::new("/definitely/not/here/sheet.json")));
        assert_eq!(sheet, fallback_sheet());
        assert_eq!(load_initial_sheet(None), fallback_sheet());
    }

    #[test]
    fn generated_id_skips_explicit_ids_already_taken() {
        let json = r#"{"data": {"questions": [
            {"_id": "subtopic-topic-1-1-q-2", "topic": "Arrays", "title": "Explicit"},
            {"topic": "Arrays", "title": "Implicit"}
        ]}}"#;

        let sheet = sheet_from_dataset(json).unwrap();
        let ids: Vec<&str> = sheet.topics[0].sub_topics[0]
            .questions
            .iter()
            .map(|question| question.id.as_str())
            .collect();

        assert_eq!(ids, vec!["subtopic-topic-1-1-q-2", "subtopic-topic-1-1-q-3"]);
        sheet.validate().unwrap();
    }

    #[test]
    fn empty_dataset_uses_meta_defaults() {
        let sheet = sheet_from_dataset("{}").unwrap();
        assert_eq!(sheet.id, "1");
        assert_eq!(sheet.title, "Striver Sheet");
        assert_eq!(sheet.slug, "striver-sheet");
        assert!(sheet.topics.is_empty());
    }
}
