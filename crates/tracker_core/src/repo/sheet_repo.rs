//! Sheet snapshot repository contracts and implementations.
//!
//! # Responsibility
//! - Persist whole-sheet snapshots (last write wins).
//! - Restore the exact saved tree, including `order` values as stored.
//!
//! # Invariants
//! - `save_sheet` replaces every row of the sheet in one immediate
//!   transaction; on error nothing is changed.
//! - Child rows are listed by their position within the parent sequence.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::sheet::{Difficulty, Question, QuestionStatus, Sheet, SubTopic, Topic};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by sheet repository operations.
pub type SheetRepoResult<T> = Result<T, SheetRepoError>;

/// Errors from sheet snapshot persistence.
#[derive(Debug)]
pub enum SheetRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted rows cannot be converted to a valid tree.
    InvalidData(String),
}

impl Display for SheetRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "sheet repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "sheet repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted sheet data: {message}"),
        }
    }
}

impl Error for SheetRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SheetRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SheetRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for sheet snapshots.
pub trait SheetRepository {
    /// Loads the sheet stored under `slug`, if any.
    fn load_sheet(&self, slug: &str) -> SheetRepoResult<Option<Sheet>>;
    /// Persists `sheet`, replacing any snapshot with the same id or slug.
    fn save_sheet(&self, sheet: &Sheet) -> SheetRepoResult<()>;
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemorySheetRepository {
    snapshot: RefCell<Option<Sheet>>,
}

impl InMemorySheetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the last saved sheet.
    pub fn snapshot(&self) -> Option<Sheet> {
        self.snapshot.borrow().clone()
    }
}

impl SheetRepository for InMemorySheetRepository {
    fn load_sheet(&self, slug: &str) -> SheetRepoResult<Option<Sheet>> {
        Ok(self
            .snapshot
            .borrow()
            .as_ref()
            .filter(|sheet| sheet.slug == slug)
            .cloned())
    }

    fn save_sheet(&self, sheet: &Sheet) -> SheetRepoResult<()> {
        *self.snapshot.borrow_mut() = Some(sheet.clone());
        Ok(())
    }
}

/// SQLite-backed snapshot repository.
pub struct SqliteSheetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSheetRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> SheetRepoResult<Self> {
        ensure_sheet_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SheetRepository for SqliteSheetRepository<'_> {
    fn load_sheet(&self, slug: &str) -> SheetRepoResult<Option<Sheet>> {
        let header: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT sheet_id, title, slug
                 FROM sheets
                 WHERE slug = ?1;",
                [slug],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((sheet_id, title, slug)) = header else {
            return Ok(None);
        };

        let mut sheet = Sheet {
            id: sheet_id,
            title,
            slug,
            topics: Vec::new(),
        };
        load_topics(self.conn, &mut sheet)?;
        load_subtopics(self.conn, &mut sheet)?;
        load_questions(self.conn, &mut sheet)?;
        Ok(Some(sheet))
    }

    fn save_sheet(&self, sheet: &Sheet) -> SheetRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        // Child rows cascade from the sheet row.
        tx.execute(
            "DELETE FROM sheets WHERE sheet_id = ?1 OR slug = ?2;",
            params![sheet.id.as_str(), sheet.slug.as_str()],
        )?;
        tx.execute(
            "INSERT INTO sheets (sheet_id, slug, title) VALUES (?1, ?2, ?3);",
            params![sheet.id.as_str(), sheet.slug.as_str(), sheet.title.as_str()],
        )?;
        insert_children(&tx, sheet)?;
        tx.commit()?;
        Ok(())
    }
}

fn insert_children(tx: &Transaction<'_>, sheet: &Sheet) -> SheetRepoResult<()> {
    let mut topic_stmt = tx.prepare(
        "INSERT INTO topics (sheet_id, position, topic_id, title, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5);",
    )?;
    let mut subtopic_stmt = tx.prepare(
        "INSERT INTO subtopics (
            sheet_id, topic_position, position, subtopic_id, title, sort_order
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
    )?;
    let mut question_stmt = tx.prepare(
        "INSERT INTO questions (
            sheet_id,
            topic_position,
            subtopic_position,
            position,
            question_id,
            title,
            link,
            difficulty,
            status,
            sort_order
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
    )?;

    for (topic_pos, topic) in sheet.topics.iter().enumerate() {
        topic_stmt.execute(params![
            sheet.id.as_str(),
            topic_pos as i64,
            topic.id.as_str(),
            topic.title.as_str(),
            i64::from(topic.order),
        ])?;
        for (sub_pos, sub_topic) in topic.sub_topics.iter().enumerate() {
            subtopic_stmt.execute(params![
                sheet.id.as_str(),
                topic_pos as i64,
                sub_pos as i64,
                sub_topic.id.as_str(),
                sub_topic.title.as_str(),
                i64::from(sub_topic.order),
            ])?;
            for (question_pos, question) in sub_topic.questions.iter().enumerate() {
                question_stmt.execute(params![
                    sheet.id.as_str(),
                    topic_pos as i64,
                    sub_pos as i64,
                    question_pos as i64,
                    question.id.as_str(),
                    question.title.as_str(),
                    question.link.as_str(),
                    question.difficulty.label(),
                    question.status.label(),
                    i64::from(question.order),
                ])?;
            }
        }
    }
    Ok(())
}

fn load_topics(conn: &Connection, sheet: &mut Sheet) -> SheetRepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT position, topic_id, title, sort_order
         FROM topics
         WHERE sheet_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([sheet.id.as_str()])?;
    while let Some(row) = rows.next()? {
        expect_position(row.get(0)?, sheet.topics.len(), "topics.position")?;
        sheet.topics.push(Topic {
            id: row.get(1)?,
            title: row.get(2)?,
            order: parse_sort_order(row.get(3)?, "topics.sort_order")?,
            sub_topics: Vec::new(),
        });
    }
    Ok(())
}

fn load_subtopics(conn: &Connection, sheet: &mut Sheet) -> SheetRepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT topic_position, position, subtopic_id, title, sort_order
         FROM subtopics
         WHERE sheet_id = ?1
         ORDER BY topic_position ASC, position ASC;",
    )?;
    let mut rows = stmt.query([sheet.id.as_str()])?;
    while let Some(row) = rows.next()? {
        let topic = parent_at(&mut sheet.topics, row.get(0)?, "subtopics.topic_position")?;
        expect_position(row.get(1)?, topic.sub_topics.len(), "subtopics.position")?;
        topic.sub_topics.push(SubTopic {
            id: row.get(2)?,
            title: row.get(3)?,
            order: parse_sort_order(row.get(4)?, "subtopics.sort_order")?,
            questions: Vec::new(),
        });
    }
    Ok(())
}

fn load_questions(conn: &Connection, sheet: &mut Sheet) -> SheetRepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT
            topic_position,
            subtopic_position,
            position,
            question_id,
            title,
            link,
            difficulty,
            status,
            sort_order
         FROM questions
         WHERE sheet_id = ?1
         ORDER BY topic_position ASC, subtopic_position ASC, position ASC;",
    )?;
    let mut rows = stmt.query([sheet.id.as_str()])?;
    while let Some(row) = rows.next()? {
        let topic = parent_at(&mut sheet.topics, row.get(0)?, "questions.topic_position")?;
        let sub_topic = parent_at(
            &mut topic.sub_topics,
            row.get(1)?,
            "questions.subtopic_position",
        )?;
        expect_position(row.get(2)?, sub_topic.questions.len(), "questions.position")?;

        let difficulty_text: String = row.get(6)?;
        let difficulty = Difficulty::parse(&difficulty_text).ok_or_else(|| {
            SheetRepoError::InvalidData(format!(
                "invalid difficulty `{difficulty_text}` in questions.difficulty"
            ))
        })?;
        let status_text: String = row.get(7)?;
        let status = QuestionStatus::parse(&status_text).ok_or_else(|| {
            SheetRepoError::InvalidData(format!(
                "invalid status `{status_text}` in questions.status"
            ))
        })?;

        sub_topic.questions.push(Question {
            id: row.get(3)?,
            title: row.get(4)?,
            link: row.get(5)?,
            difficulty,
            status,
            order: parse_sort_order(row.get(8)?, "questions.sort_order")?,
        });
    }
    Ok(())
}

fn parent_at<'a, T>(
    parents: &'a mut [T],
    position: i64,
    column: &'static str,
) -> SheetRepoResult<&'a mut T> {
    usize::try_from(position)
        .ok()
        .and_then(|index| parents.get_mut(index))
        .ok_or_else(|| {
            SheetRepoError::InvalidData(format!("dangling parent position `{position}` in {column}"))
        })
}

fn expect_position(actual: i64, expected: usize, column: &'static str) -> SheetRepoResult<()> {
    if usize::try_from(actual).ok() != Some(expected) {
        return Err(SheetRepoError::InvalidData(format!(
            "non-contiguous position `{actual}` in {column}, expected {expected}"
        )));
    }
    Ok(())
}

fn parse_sort_order(value: i64, column: &'static str) -> SheetRepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| SheetRepoError::InvalidData(format!("invalid order `{value}` in {column}")))
}

fn ensure_sheet_connection_ready(conn: &Connection) -> SheetRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(SheetRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["sheets", "topics", "subtopics", "questions"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(SheetRepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{InMemorySheetRepository, SheetRepository};
    use crate::model::sheet::Sheet;

    #[test]
    fn in_memory_repository_filters_by_slug() {
        let repo = InMemorySheetRepository::new();
        let sheet = Sheet::with_id("1", "Sheet", "my-sheet").unwrap();
        repo.save_sheet(&sheet).unwrap();

        assert_eq!(repo.load_sheet("my-sheet").unwrap(), Some(sheet));
        assert_eq!(repo.load_sheet("other").unwrap(), None);
    }
}
