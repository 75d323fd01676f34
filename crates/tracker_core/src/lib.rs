//! Core domain logic for the practice-sheet tracker.
//! Owns the sheet tree, its ordering rules, persistence and client sync.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod order;
pub mod repo;
pub mod seed;
pub mod service;
pub mod stats;
pub mod store;
pub mod sync;

pub use api::envelope::ApiResponse;
pub use api::sheet_api::{ReorderBody, SheetApi, TitleBody};
pub use config::TrackerConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::sheet::{
    Difficulty, ModelValidationError, NodeKind, Question, QuestionStatus, Sheet, SubTopic, Topic,
};
pub use order::siblings::{OrderError, Ordered};
pub use repo::sheet_repo::{
    InMemorySheetRepository, SheetRepoError, SheetRepoResult, SheetRepository,
    SqliteSheetRepository,
};
pub use seed::{fallback_sheet, load_initial_sheet, sheet_from_dataset, SeedError};
pub use service::mutation::{
    MutationOutcome, QuestionDraft, QuestionPatch, ReplaceMode, SheetMutation,
};
pub use service::sheet_service::{ErrorKind, SheetService, SheetServiceError, SheetServiceResult};
pub use stats::SheetStats;
pub use store::SheetStore;
pub use sync::projection::{MutationState, MutationTicket, ProjectionError, SheetProjection};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
