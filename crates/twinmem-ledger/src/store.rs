//! SQLite-backed question ledger.
//!
//! Single-writer per process. Each operation is one transaction; no
//! cross-operation transaction spans a policy turn, so in multi-process
//! deployments a search-then-write sequence can race with a concurrent
//! operator update between the two calls.

use crate::migration::run_migrations;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;
use twinmem_types::error::{TwinError, TwinResult};
use twinmem_types::question::{AnswerStatus, Question};

/// Durable store of questions and their resolution state.
#[derive(Clone)]
pub struct QuestionLedger {
    conn: Arc<Mutex<Connection>>,
}

impl QuestionLedger {
    /// Open (or create) the ledger database at the given path.
    pub fn open(path: &Path) -> TwinResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| TwinError::Ledger(e.to_string()))?;
        run_migrations(&conn).map_err(|e| TwinError::Ledger(e.to_string()))?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Open an in-memory ledger. Used by tests and ephemeral sessions.
    pub fn open_in_memory() -> TwinResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| TwinError::Ledger(e.to_string()))?;
        run_migrations(&conn).map_err(|e| TwinError::Ledger(e.to_string()))?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Wrap an already-migrated connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a new question with no answer. Atomic: either the full row is
    /// visible or nothing is. Returns the assigned id.
    pub fn record_unanswered(&self, question: &str) -> TwinResult<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TwinError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO questions (question, answer) VALUES (?1, NULL)",
            rusqlite::params![question],
        )
        .map_err(|e| TwinError::Ledger(e.to_string()))?;
        let id = conn.last_insert_rowid();
        debug!(id, "Recorded unanswered question");
        Ok(id)
    }

    /// All pending questions, ordered by insertion (ascending id).
    pub fn list_unanswered(&self) -> TwinResult<Vec<(i64, String)>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TwinError::Internal(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT id, question FROM questions WHERE answer IS NULL ORDER BY id ASC")
            .map_err(|e| TwinError::Ledger(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| TwinError::Ledger(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| TwinError::Ledger(e.to_string()))?);
        }
        Ok(out)
    }

    /// All answered questions with their answers, ordered by insertion.
    pub fn list_answered(&self) -> TwinResult<Vec<(String, String)>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TwinError::Internal(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT question, answer FROM questions WHERE answer IS NOT NULL ORDER BY id ASC",
            )
            .map_err(|e| TwinError::Ledger(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| TwinError::Ledger(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| TwinError::Ledger(e.to_string()))?);
        }
        Ok(out)
    }

    /// Record the official answer for a question. Idempotent: re-invoking
    /// with the same id and answer leaves state unchanged. An unknown id
    /// reports `NotFound` rather than raising.
    pub fn record_answer(&self, id: i64, answer: &str) -> TwinResult<AnswerStatus> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TwinError::Internal(e.to_string()))?;
        let updated = conn
            .execute(
                "UPDATE questions SET answer = ?1 WHERE id = ?2",
                rusqlite::params![answer, id],
            )
            .map_err(|e| TwinError::Ledger(e.to_string()))?;
        if updated == 0 {
            debug!(id, "Answer recording referenced a nonexistent question");
            return Ok(AnswerStatus::NotFound);
        }
        debug!(id, "Recorded answer");
        Ok(AnswerStatus::Recorded)
    }

    /// Fetch a single question row by id.
    pub fn get(&self, id: i64) -> TwinResult<Option<Question>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TwinError::Internal(e.to_string()))?;
        conn.query_row(
            "SELECT id, question, answer FROM questions WHERE id = ?1",
            rusqlite::params![id],
            |row| {
                Ok(Question {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| TwinError::Ledger(e.to_string()))
    }
}

/// Render pending questions as a plain-text listing, one entry per line.
/// Intended for a human operator, not machine parsing.
pub fn render_unanswered(rows: &[(i64, String)]) -> String {
    if rows.is_empty() {
        return "No questions with no answer found".to_string();
    }
    rows.iter()
        .map(|(id, question)| format!("Question id {id}: {question}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render answered questions as a plain-text listing.
pub fn render_answered(rows: &[(String, String)]) -> String {
    rows.iter()
        .map(|(question, answer)| format!("Question: {question}\nAnswer: {answer}\n"))
        .collect::<Vec<_>>()
        .join("\n")
}
