//! Sheet mutation service.
//!
//! # Responsibility
//! - Resolve id paths (topic -> subtopic -> question) with per-level
//!   not-found errors.
//! - Delegate structural changes to `order::siblings`.
//! - Persist each committed tree through a `SheetRepository`.
//!
//! # Invariants
//! - Every mutation is computed on a working copy, saved, then swapped into
//!   the store. A failure at any step leaves store and snapshot unchanged.
//! - Sibling orders are dense after every mutation except trusted
//!   `replace_sheet`, which stores the caller's tree verbatim.
//! - The loaded slug never changes; replaced trees inherit it.
//! - Lookups are linear scans over each level; sheets are small enough that
//!   an id index is not kept.

use crate::model::sheet::{
    normalize_title, Difficulty, ModelValidationError, NodeKind, Question, QuestionStatus, Sheet,
    SubTopic, Topic,
};
use crate::order::siblings::{
    append, move_to, remove_by_id, replace_all, replace_all_strict, OrderError,
};
use crate::repo::sheet_repo::{SheetRepoError, SheetRepository};
use crate::service::mutation::{
    MutationOutcome, QuestionDraft, QuestionPatch, ReplaceMode, SheetMutation,
};
use crate::store::SheetStore;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Coarse error taxonomy shared with transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    OutOfRange,
    InvalidInput,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::OutOfRange => "out_of_range",
            Self::InvalidInput => "invalid_input",
            Self::Storage => "storage",
        }
    }
}

/// Errors from sheet service operations.
#[derive(Debug)]
pub enum SheetServiceError {
    /// No sheet with this slug is loaded.
    SheetNotFound(String),
    TopicNotFound(String),
    /// Topic exists but has no sub-topic with this id.
    SubTopicNotFound {
        topic_id: String,
        subtopic_id: String,
    },
    /// Both ancestors exist but the question does not.
    QuestionNotFound {
        topic_id: String,
        subtopic_id: String,
        question_id: String,
    },
    /// Move destination outside the sibling range.
    OutOfRange { index: usize, len: usize },
    /// Blank title, invalid strict-replace tree.
    InvalidInput(ModelValidationError),
    /// Strict ordering check failed.
    InvalidOrdering(OrderError),
    /// Snapshot persistence failed.
    Repo(SheetRepoError),
}

impl SheetServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SheetNotFound(_)
            | Self::TopicNotFound(_)
            | Self::SubTopicNotFound { .. }
            | Self::QuestionNotFound { .. } => ErrorKind::NotFound,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidInput(_) | Self::InvalidOrdering(_) => ErrorKind::InvalidInput,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }
}

impl Display for SheetServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SheetNotFound(slug) => write!(f, "Sheet not found: {slug}"),
            Self::TopicNotFound(id) => write!(f, "Topic not found: {id}"),
            Self::SubTopicNotFound {
                topic_id,
                subtopic_id,
            } => write!(f, "Sub-topic not found: {subtopic_id} (topic {topic_id})"),
            Self::QuestionNotFound {
                topic_id,
                subtopic_id,
                question_id,
            } => write!(
                f,
                "Question not found: {question_id} (topic {topic_id}, sub-topic {subtopic_id})"
            ),
            Self::OutOfRange { index, len } => write!(
                f,
                "destination index {index} is out of range for {len} sibling(s)"
            ),
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::InvalidOrdering(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SheetServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::InvalidOrdering(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for SheetServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<SheetRepoError> for SheetServiceError {
    fn from(value: SheetRepoError) -> Self {
        Self::Repo(value)
    }
}

pub type SheetServiceResult<T> = Result<T, SheetServiceError>;

/// Tree-aware CRUD and reorder facade over one authoritative sheet.
///
/// Methods take `&mut self`, so each mutation runs to completion before any
/// other call can observe the tree. Wrap the service in a mutex to share it.
pub struct SheetService<R: SheetRepository> {
    store: SheetStore,
    repo: R,
}

impl<R: SheetRepository> SheetService<R> {
    /// Creates a service over an already seeded store.
    pub fn new(store: SheetStore, repo: R) -> Self {
        Self { store, repo }
    }

    /// Loads the snapshot stored under `slug`, or seeds and saves one.
    pub fn open(repo: R, slug: &str, seed: impl FnOnce() -> Sheet) -> SheetServiceResult<Self> {
        let sheet = match repo.load_sheet(slug)? {
            Some(sheet) => {
                info!(
                    "event=sheet_open module=service status=ok source=snapshot topics={}",
                    sheet.topics.len()
                );
                sheet
            }
            None => {
                let sheet = seed();
                repo.save_sheet(&sheet)?;
                info!(
                    "event=sheet_open module=service status=ok source=seed topics={}",
                    sheet.topics.len()
                );
                sheet
            }
        };
        Ok(Self::new(SheetStore::init(sheet), repo))
    }

    pub fn sheet(&self) -> &Sheet {
        self.store.get()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Returns the sheet when `slug` matches the loaded one.
    pub fn fetch_sheet(&self, slug: &str) -> SheetServiceResult<&Sheet> {
        let sheet = self.store.get();
        if sheet.slug != slug {
            return Err(SheetServiceError::SheetNotFound(slug.to_string()));
        }
        Ok(sheet)
    }

    /// Replaces the whole tree verbatim, except for the slug.
    ///
    /// Trust boundary: ids and orders are not re-validated. Callers
    /// restoring from export must guarantee them, or use
    /// [`Self::replace_sheet_with`] with `ReplaceMode::Strict`.
    pub fn replace_sheet(&mut self, sheet: Sheet) -> SheetServiceResult<Sheet> {
        self.replace_sheet_with(sheet, ReplaceMode::Trusting)
    }

    /// The slug is immutable: `Trusting` keeps the current one, `Strict`
    /// rejects a tree that carries another.
    pub fn replace_sheet_with(
        &mut self,
        mut sheet: Sheet,
        mode: ReplaceMode,
    ) -> SheetServiceResult<Sheet> {
        let current_slug = &self.store.get().slug;
        if &sheet.slug != current_slug {
            if mode == ReplaceMode::Strict {
                return Err(ModelValidationError::SlugChanged {
                    expected: current_slug.clone(),
                    actual: sheet.slug,
                }
                .into());
            }
            info!(
                "event=slug_pinned module=service status=ok from={} to={current_slug}",
                sheet.slug
            );
            sheet.slug = current_slug.clone();
        }
        if mode == ReplaceMode::Strict {
            sheet.validate()?;
        }
        self.commit("replace_sheet", |current| {
            *current = sheet;
            Ok(current.clone())
        })
    }

    pub fn add_topic(&mut self, title: &str) -> SheetServiceResult<Topic> {
        let topic = Topic::new(title)?;
        self.commit("add_topic", |sheet| {
            Ok(append(&mut sheet.topics, topic).clone())
        })
    }

    pub fn rename_topic(&mut self, topic_id: &str, title: &str) -> SheetServiceResult<Topic> {
        let title = normalize_title(title, NodeKind::Topic)?;
        self.commit("rename_topic", |sheet| {
            let topic = find_topic(sheet, topic_id)?;
            topic.title = title;
            Ok(topic.clone())
        })
    }

    /// Removes the topic with all its sub-topics and questions.
    pub fn delete_topic(&mut self, topic_id: &str) -> SheetServiceResult<Topic> {
        self.commit("delete_topic", |sheet| {
            remove_by_id(&mut sheet.topics, topic_id)
                .map_err(|err| lift(err, || SheetServiceError::TopicNotFound(topic_id.into())))
        })
    }

    pub fn move_topic(&mut self, topic_id: &str, to: usize) -> SheetServiceResult<Sheet> {
        self.commit("move_topic", |sheet| {
            move_to(&mut sheet.topics, topic_id, to)
                .map_err(|err| lift(err, || SheetServiceError::TopicNotFound(topic_id.into())))?;
            Ok(sheet.clone())
        })
    }

    pub fn add_subtopic(&mut self, topic_id: &str, title: &str) -> SheetServiceResult<SubTopic> {
        let sub_topic = SubTopic::new(title)?;
        self.commit("add_subtopic", |sheet| {
            let topic = find_topic(sheet, topic_id)?;
            Ok(append(&mut topic.sub_topics, sub_topic).clone())
        })
    }

    pub fn rename_subtopic(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        title: &str,
    ) -> SheetServiceResult<SubTopic> {
        let title = normalize_title(title, NodeKind::SubTopic)?;
        self.commit("rename_subtopic", |sheet| {
            let sub_topic = find_subtopic(sheet, topic_id, subtopic_id)?;
            sub_topic.title = title;
            Ok(sub_topic.clone())
        })
    }

    /// Removes the sub-topic with all its questions.
    pub fn delete_subtopic(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
    ) -> SheetServiceResult<SubTopic> {
        self.commit("delete_subtopic", |sheet| {
            let topic = find_topic(sheet, topic_id)?;
            remove_by_id(&mut topic.sub_topics, subtopic_id)
                .map_err(|err| lift(err, || subtopic_not_found(topic_id, subtopic_id)))
        })
    }

    pub fn move_subtopic(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        to: usize,
    ) -> SheetServiceResult<Sheet> {
        self.commit("move_subtopic", |sheet| {
            let topic = find_topic(sheet, topic_id)?;
            move_to(&mut topic.sub_topics, subtopic_id, to)
                .map_err(|err| lift(err, || subtopic_not_found(topic_id, subtopic_id)))?;
            Ok(sheet.clone())
        })
    }

    /// Appends a question. Missing link is empty; missing or unknown
    /// difficulty/status fall back to `Medium` / `Not Started`.
    pub fn add_question(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        draft: QuestionDraft,
    ) -> SheetServiceResult<Question> {
        let mut question = Question::new(&draft.title)?;
        question.link = draft.link.map(|link| link.trim().to_string()).unwrap_or_default();
        if let Some(difficulty) = provided(draft.difficulty.as_deref()) {
            question.difficulty = Difficulty::normalize(difficulty);
        }
        if let Some(status) = provided(draft.status.as_deref()) {
            question.status = QuestionStatus::normalize(status);
        }

        self.commit("add_question", |sheet| {
            let sub_topic = find_subtopic(sheet, topic_id, subtopic_id)?;
            Ok(append(&mut sub_topic.questions, question).clone())
        })
    }

    /// Applies a partial update; `order` is never touched.
    pub fn update_question(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
        patch: QuestionPatch,
    ) -> SheetServiceResult<Question> {
        let title = provided(patch.title.as_deref()).map(str::to_string);
        let difficulty = provided(patch.difficulty.as_deref()).map(Difficulty::normalize);
        let status = provided(patch.status.as_deref()).map(QuestionStatus::normalize);
        let link = patch.link.map(|link| link.trim().to_string());

        self.commit("update_question", |sheet| {
            let question = find_question(sheet, topic_id, subtopic_id, question_id)?;
            if let Some(title) = title {
                question.title = title;
            }
            if let Some(link) = link {
                question.link = link;
            }
            if let Some(difficulty) = difficulty {
                question.difficulty = difficulty;
            }
            if let Some(status) = status {
                question.status = status;
            }
            Ok(question.clone())
        })
    }

    /// Advances status `Not Started -> In Progress -> Solved -> Not Started`.
    pub fn cycle_question_status(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
    ) -> SheetServiceResult<Question> {
        self.commit("cycle_question_status", |sheet| {
            let question = find_question(sheet, topic_id, subtopic_id, question_id)?;
            question.status = question.status.next();
            Ok(question.clone())
        })
    }

    pub fn delete_question(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
    ) -> SheetServiceResult<Question> {
        self.commit("delete_question", |sheet| {
            let sub_topic = find_subtopic(sheet, topic_id, subtopic_id)?;
            remove_by_id(&mut sub_topic.questions, question_id).map_err(|err| {
                lift(err, || question_not_found(topic_id, subtopic_id, question_id))
            })
        })
    }

    pub fn move_question(
        &mut self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
        to: usize,
    ) -> SheetServiceResult<Sheet> {
        self.commit("move_question", |sheet| {
            let sub_topic = find_subtopic(sheet, topic_id, subtopic_id)?;
            move_to(&mut sub_topic.questions, question_id, to).map_err(|err| {
                lift(err, || question_not_found(topic_id, subtopic_id, question_id))
            })?;
            Ok(sheet.clone())
        })
    }

    /// Commits a full topic tree whose sibling sequences were reshuffled at
    /// any depth, renumbering every level to match the submitted sequence.
    ///
    /// Like `replace_sheet`, the submitted id sets are trusted.
    pub fn reorder(&mut self, topics: Vec<Topic>) -> SheetServiceResult<Sheet> {
        self.reorder_with(topics, ReplaceMode::Trusting)
    }

    /// `Strict` rejects any tree whose sibling sets are not permutations of
    /// the current ones, so nodes can neither appear, vanish nor change
    /// parent.
    pub fn reorder_with(
        &mut self,
        topics: Vec<Topic>,
        mode: ReplaceMode,
    ) -> SheetServiceResult<Sheet> {
        self.commit("reorder", |sheet| {
            sheet.topics = match mode {
                ReplaceMode::Trusting => renumber_all_levels(topics),
                ReplaceMode::Strict => {
                    permute_all_levels(&sheet.topics, topics).map_err(SheetServiceError::InvalidOrdering)?
                }
            };
            Ok(sheet.clone())
        })
    }

    /// Dispatches one mutation request and returns its confirmed outcome.
    pub fn apply(&mut self, mutation: SheetMutation) -> SheetServiceResult<MutationOutcome> {
        let outcome = match mutation {
            SheetMutation::ReplaceSheet { sheet, mode } => {
                MutationOutcome::SheetReplaced(self.replace_sheet_with(sheet, mode)?)
            }
            SheetMutation::AddTopic { title } => MutationOutcome::TopicAdded(self.add_topic(&title)?),
            SheetMutation::RenameTopic { topic_id, title } => {
                MutationOutcome::TopicRenamed(self.rename_topic(&topic_id, &title)?)
            }
            SheetMutation::DeleteTopic { topic_id } => {
                self.delete_topic(&topic_id)?;
                MutationOutcome::TopicDeleted { topic_id }
            }
            SheetMutation::MoveTopic { topic_id, to } => {
                MutationOutcome::Reordered(self.move_topic(&topic_id, to)?)
            }
            SheetMutation::AddSubTopic { topic_id, title } => {
                let sub_topic = self.add_subtopic(&topic_id, &title)?;
                MutationOutcome::SubTopicAdded {
                    topic_id,
                    sub_topic,
                }
            }
            SheetMutation::RenameSubTopic {
                topic_id,
                subtopic_id,
                title,
            } => {
                let sub_topic = self.rename_subtopic(&topic_id, &subtopic_id, &title)?;
                MutationOutcome::SubTopicRenamed {
                    topic_id,
                    sub_topic,
                }
            }
            SheetMutation::DeleteSubTopic {
                topic_id,
                subtopic_id,
            } => {
                self.delete_subtopic(&topic_id, &subtopic_id)?;
                MutationOutcome::SubTopicDeleted {
                    topic_id,
                    subtopic_id,
                }
            }
            SheetMutation::MoveSubTopic {
                topic_id,
                subtopic_id,
                to,
            } => MutationOutcome::Reordered(self.move_subtopic(&topic_id, &subtopic_id, to)?),
            SheetMutation::AddQuestion {
                topic_id,
                subtopic_id,
                draft,
            } => {
                let question = self.add_question(&topic_id, &subtopic_id, draft)?;
                MutationOutcome::QuestionAdded {
                    topic_id,
                    subtopic_id,
                    question,
                }
            }
            SheetMutation::UpdateQuestion {
                topic_id,
                subtopic_id,
                question_id,
                patch,
            } => {
                let question = self.update_question(&topic_id, &subtopic_id, &question_id, patch)?;
                MutationOutcome::QuestionUpdated {
                    topic_id,
                    subtopic_id,
                    question,
                }
            }
            SheetMutation::CycleQuestionStatus {
                topic_id,
                subtopic_id,
                question_id,
            } => {
                let question = self.cycle_question_status(&topic_id, &subtopic_id, &question_id)?;
                MutationOutcome::QuestionUpdated {
                    topic_id,
                    subtopic_id,
                    question,
                }
            }
            SheetMutation::DeleteQuestion {
                topic_id,
                subtopic_id,
                question_id,
            } => {
                self.delete_question(&topic_id, &subtopic_id, &question_id)?;
                MutationOutcome::QuestionDeleted {
                    topic_id,
                    subtopic_id,
                    question_id,
                }
            }
            SheetMutation::MoveQuestion {
                topic_id,
                subtopic_id,
                question_id,
                to,
            } => MutationOutcome::Reordered(self.move_question(
                &topic_id,
                &subtopic_id,
                &question_id,
                to,
            )?),
            SheetMutation::Reorder { topics, mode } => {
                MutationOutcome::Reordered(self.reorder_with(topics, mode)?)
            }
        };
        Ok(outcome)
    }

    fn commit<T>(
        &mut self,
        op: &'static str,
        mutate: impl FnOnce(&mut Sheet) -> SheetServiceResult<T>,
    ) -> SheetServiceResult<T> {
        let started_at = Instant::now();
        let mut next = self.store.get().clone();

        let result = match mutate(&mut next) {
            Ok(value) => self
                .repo
                .save_sheet(&next)
                .map(|()| value)
                .map_err(SheetServiceError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(value) => {
                self.store.replace(next);
                info!(
                    "event=sheet_mutation module=service status=ok op={op} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Storage {
                    error!(
                        "event=sheet_mutation module=service status=error op={op} error_code={} error={err}",
                        kind.as_str()
                    );
                } else {
                    warn!(
                        "event=sheet_mutation module=service status=error op={op} error_code={} error={err}",
                        kind.as_str()
                    );
                }
                Err(err)
            }
        }
    }
}

/// Renumbers topics, each topic's sub-topics and each sub-topic's questions
/// to match their submitted sequence.
pub fn renumber_all_levels(topics: Vec<Topic>) -> Vec<Topic> {
    replace_all(
        topics
            .into_iter()
            .map(|mut topic| {
                topic.sub_topics = replace_all(
                    std::mem::take(&mut topic.sub_topics)
                        .into_iter()
                        .map(|mut sub_topic| {
                            sub_topic.questions = replace_all(std::mem::take(&mut sub_topic.questions));
                            sub_topic
                        })
                        .collect(),
                );
                topic
            })
            .collect(),
    )
}

fn permute_all_levels(current: &[Topic], proposed: Vec<Topic>) -> Result<Vec<Topic>, OrderError> {
    let mut topics = replace_all_strict(current, proposed)?;
    for topic in &mut topics {
        let Some(current_topic) = current.iter().find(|item| item.id == topic.id) else {
            return Err(OrderError::NotFound(topic.id.clone()));
        };
        let mut sub_topics =
            replace_all_strict(&current_topic.sub_topics, std::mem::take(&mut topic.sub_topics))?;
        for sub_topic in &mut sub_topics {
            let Some(current_sub_topic) = current_topic.sub_topic(&sub_topic.id) else {
                return Err(OrderError::NotFound(sub_topic.id.clone()));
            };
            sub_topic.questions = replace_all_strict(
                &current_sub_topic.questions,
                std::mem::take(&mut sub_topic.questions),
            )?;
        }
        topic.sub_topics = sub_topics;
    }
    Ok(topics)
}

fn find_topic<'a>(sheet: &'a mut Sheet, topic_id: &str) -> SheetServiceResult<&'a mut Topic> {
    sheet
        .topic_mut(topic_id)
        .ok_or_else(|| SheetServiceError::TopicNotFound(topic_id.to_string()))
}

fn find_subtopic<'a>(
    sheet: &'a mut Sheet,
    topic_id: &str,
    subtopic_id: &str,
) -> SheetServiceResult<&'a mut SubTopic> {
    find_topic(sheet, topic_id)?
        .sub_topic_mut(subtopic_id)
        .ok_or_else(|| subtopic_not_found(topic_id, subtopic_id))
}

fn find_question<'a>(
    sheet: &'a mut Sheet,
    topic_id: &str,
    subtopic_id: &str,
    question_id: &str,
) -> SheetServiceResult<&'a mut Question> {
    find_subtopic(sheet, topic_id, subtopic_id)?
        .question_mut(question_id)
        .ok_or_else(|| question_not_found(topic_id, subtopic_id, question_id))
}

fn subtopic_not_found(topic_id: &str, subtopic_id: &str) -> SheetServiceError {
    SheetServiceError::SubTopicNotFound {
        topic_id: topic_id.to_string(),
        subtopic_id: subtopic_id.to_string(),
    }
}

fn question_not_found(topic_id: &str, subtopic_id: &str, question_id: &str) -> SheetServiceError {
    SheetServiceError::QuestionNotFound {
        topic_id: topic_id.to_string(),
        subtopic_id: subtopic_id.to_string(),
        question_id: question_id.to_string(),
    }
}

/// Maps an engine error onto the lookup level it happened at.
fn lift(err: OrderError, not_found: impl FnOnce() -> SheetServiceError) -> SheetServiceError {
    match err {
        OrderError::NotFound(_) => not_found(),
        OrderError::OutOfRange { index, len } => SheetServiceError::OutOfRange { index, len },
        other => SheetServiceError::InvalidOrdering(other),
    }
}

/// Empty and whitespace-only values count as "not provided".
fn provided(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
