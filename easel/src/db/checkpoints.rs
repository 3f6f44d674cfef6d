//! Checkpoint persistence operations

use super::Database;
use crate::error::PersistenceError;
use crate::store::CheckpointStore;
use crate::workflow::{Checkpoint, PendingQuestion, Position, WorkflowState};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row};
use serde::Serialize;

/// Latest state of one thread (for listing)
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub sequence: i64,
    pub position: Position,
    pub topic: String,
    pub updated_at: DateTime<Utc>,
}

/// A checkpoint row as stored, before decoding
struct CheckpointRow {
    thread_id: String,
    sequence: i64,
    position: String,
    state: String,
    pending_question: Option<String>,
    created_at: String,
}

impl CheckpointRow {
    const COLUMNS: &'static str =
        "thread_id, sequence, position, state, pending_question, created_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            thread_id: row.get(0)?,
            sequence: row.get(1)?,
            position: row.get(2)?,
            state: row.get(3)?,
            pending_question: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> Result<Checkpoint, PersistenceError> {
        let corrupt = |message: String| PersistenceError::Corrupt {
            thread_id: self.thread_id.clone(),
            sequence: self.sequence,
            message,
        };

        let position: Position = self
            .position
            .parse()
            .map_err(|e: anyhow::Error| corrupt(e.to_string()))?;
        let state: WorkflowState = serde_json::from_str(&self.state)
            .map_err(|e| corrupt(format!("bad state: {}", e)))?;
        let pending_question: Option<PendingQuestion> = self
            .pending_question
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt(format!("bad pending question: {}", e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(format!("bad timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(Checkpoint {
            thread_id: self.thread_id,
            sequence: self.sequence,
            position,
            state,
            pending_question,
            created_at,
        })
    }
}

impl Database {
    /// Insert a checkpoint; fails if its (thread, sequence) slot is taken
    pub fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let state = serde_json::to_string(&checkpoint.state)?;
        let pending_question = checkpoint
            .pending_question
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO checkpoints (thread_id, sequence, position, state, pending_question, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            (
                &checkpoint.thread_id,
                checkpoint.sequence,
                checkpoint.position.as_str(),
                &state,
                &pending_question,
                // fixed width so rows sort by time as text
                checkpoint
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        )
        .with_context(|| {
            format!(
                "Failed to append checkpoint {} for thread '{}'",
                checkpoint.sequence, checkpoint.thread_id
            )
        })?;

        Ok(())
    }

    fn latest_row(&self, thread_id: &str) -> Result<Option<CheckpointRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM checkpoints WHERE thread_id = ?1 ORDER BY sequence DESC LIMIT 1",
            CheckpointRow::COLUMNS
        );
        let row = conn
            .query_row(&sql, [thread_id], CheckpointRow::from_row)
            .optional()
            .with_context(|| format!("Failed to load latest checkpoint for '{}'", thread_id))?;
        Ok(row)
    }

    fn history_rows(&self, thread_id: &str) -> Result<Vec<CheckpointRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM checkpoints WHERE thread_id = ?1 ORDER BY sequence ASC",
            CheckpointRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([thread_id], CheckpointRow::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to load history for '{}'", thread_id))?;
        Ok(rows)
    }

    /// Latest checkpoint of every thread, most recently active first
    pub fn list_threads(&self, limit: usize) -> Result<Vec<ThreadSummary>> {
        let conn = self.lock()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM checkpoints c
            WHERE c.sequence = (
                SELECT MAX(sequence) FROM checkpoints WHERE thread_id = c.thread_id
            )
            ORDER BY c.created_at DESC
            LIMIT ?1
            "#,
            CheckpointRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit as i64], CheckpointRow::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list threads")?;
        drop(stmt);
        drop(conn);

        let mut threads = Vec::with_capacity(rows.len());
        for row in rows {
            let checkpoint = row.decode()?;
            threads.push(ThreadSummary {
                thread_id: checkpoint.thread_id,
                sequence: checkpoint.sequence,
                position: checkpoint.position,
                topic: checkpoint.state.topic,
                updated_at: checkpoint.created_at,
            });
        }
        Ok(threads)
    }
}

impl CheckpointStore for Database {
    fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError> {
        self.latest_row(thread_id)?
            .map(CheckpointRow::decode)
            .transpose()
    }

    fn append(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        self.insert_checkpoint(checkpoint)?;
        Ok(())
    }

    fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, PersistenceError> {
        self.history_rows(thread_id)?
            .into_iter()
            .map(CheckpointRow::decode)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
