//! Envelope-returning facade over `SheetService`.
//!
//! # Invariants
//! - Each call holds the service lock for its whole duration.
//! - A poisoned lock is recovered: the service only ever exposes fully
//!   committed trees, so the guarded state is still consistent.

use crate::api::envelope::ApiResponse;
use crate::model::sheet::{Question, Sheet, SubTopic, Topic};
use crate::repo::sheet_repo::SheetRepository;
use crate::service::mutation::{
    MutationOutcome, QuestionDraft, QuestionPatch, ReplaceMode, SheetMutation,
};
use crate::service::sheet_service::{SheetService, SheetServiceResult};
use crate::stats::SheetStats;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// `{title}` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleBody {
    #[serde(default)]
    pub title: String,
}

impl TitleBody {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Full topic tree submitted after a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderBody {
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub mode: ReplaceMode,
}

/// Serializes calls into one `SheetService`.
///
/// The api is `Send + Sync` only when `R: Send`. `SqliteSheetRepository`
/// borrows a `rusqlite::Connection`, which is not `Sync`, so a sqlite-backed
/// api stays on the thread that opened the connection; share it across
/// threads by opening the connection on a dedicated owner thread.
pub struct SheetApi<R: SheetRepository> {
    service: Mutex<SheetService<R>>,
}

impl<R: SheetRepository> SheetApi<R> {
    pub fn new(service: SheetService<R>) -> Self {
        Self {
            service: Mutex::new(service),
        }
    }

    pub fn into_inner(self) -> SheetService<R> {
        self.service
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fetch_sheet(&self, slug: &str) -> ApiResponse<Sheet> {
        respond(self.lock().fetch_sheet(slug).cloned())
    }

    pub fn replace_sheet(&self, sheet: Sheet) -> ApiResponse<Sheet> {
        self.replace_sheet_with(sheet, ReplaceMode::Trusting)
    }

    pub fn replace_sheet_with(&self, sheet: Sheet, mode: ReplaceMode) -> ApiResponse<Sheet> {
        match self.lock().replace_sheet_with(sheet, mode) {
            Ok(sheet) => ApiResponse::ok_with_message(sheet, "Sheet updated successfully"),
            Err(err) => ApiResponse::from_error(&err),
        }
    }

    pub fn add_topic(&self, body: TitleBody) -> ApiResponse<Topic> {
        respond(self.lock().add_topic(&body.title))
    }

    pub fn rename_topic(&self, topic_id: &str, body: TitleBody) -> ApiResponse<Topic> {
        respond(self.lock().rename_topic(topic_id, &body.title))
    }

    pub fn delete_topic(&self, topic_id: &str) -> ApiResponse<()> {
        confirm(self.lock().delete_topic(topic_id), "Topic deleted")
    }

    pub fn move_topic(&self, topic_id: &str, to: usize) -> ApiResponse<Sheet> {
        respond(self.lock().move_topic(topic_id, to))
    }

    pub fn add_subtopic(&self, topic_id: &str, body: TitleBody) -> ApiResponse<SubTopic> {
        respond(self.lock().add_subtopic(topic_id, &body.title))
    }

    pub fn rename_subtopic(
        &self,
        topic_id: &str,
        subtopic_id: &str,
        body: TitleBody,
    ) -> ApiResponse<SubTopic> {
        respond(
            self.lock()
                .rename_subtopic(topic_id, subtopic_id, &body.title),
        )
    }

    pub fn delete_subtopic(&self, topic_id: &str, subtopic_id: &str) -> ApiResponse<()> {
        confirm(
            self.lock().delete_subtopic(topic_id, subtopic_id),
            "Sub-topic deleted",
        )
    }

    pub fn move_subtopic(&self, topic_id: &str, subtopic_id: &str, to: usize) -> ApiResponse<Sheet> {
        respond(self.lock().move_subtopic(topic_id, subtopic_id, to))
    }

    pub fn add_question(
        &self,
        topic_id: &str,
        subtopic_id: &str,
        draft: QuestionDraft,
    ) -> ApiResponse<Question> {
        respond(self.lock().add_question(topic_id, subtopic_id, draft))
    }

    pub fn update_question(
        &self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
        patch: QuestionPatch,
    ) -> ApiResponse<Question> {
        respond(
            self.lock()
                .update_question(topic_id, subtopic_id, question_id, patch),
        )
    }

    pub fn cycle_question_status(
        &self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
    ) -> ApiResponse<Question> {
        respond(
            self.lock()
                .cycle_question_status(topic_id, subtopic_id, question_id),
        )
    }

    pub fn delete_question(
        &self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
    ) -> ApiResponse<()> {
        confirm(
            self.lock()
                .delete_question(topic_id, subtopic_id, question_id),
            "Question deleted",
        )
    }

    pub fn move_question(
        &self,
        topic_id: &str,
        subtopic_id: &str,
        question_id: &str,
        to: usize,
    ) -> ApiResponse<Sheet> {
        respond(
            self.lock()
                .move_question(topic_id, subtopic_id, question_id, to),
        )
    }

    pub fn reorder(&self, body: ReorderBody) -> ApiResponse<Sheet> {
        respond(self.lock().reorder_with(body.topics, body.mode))
    }

    pub fn stats(&self, slug: &str) -> ApiResponse<SheetStats> {
        respond(self.lock().fetch_sheet(slug).map(SheetStats::from_sheet))
    }

    /// Applies one tagged mutation; the outcome feeds a `SheetProjection`.
    pub fn dispatch(&self, mutation: SheetMutation) -> ApiResponse<MutationOutcome> {
        respond(self.lock().apply(mutation))
    }

    fn lock(&self) -> MutexGuard<'_, SheetService<R>> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn respond<T>(result: SheetServiceResult<T>) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::ok(data),
        Err(err) => ApiResponse::from_error(&err),
    }
}

fn confirm<T>(result: SheetServiceResult<T>, message: &str) -> ApiResponse<()> {
    match result {
        Ok(_) => ApiResponse::confirmed(message),
        Err(err) => ApiResponse::from_error(&err),
    }
}
