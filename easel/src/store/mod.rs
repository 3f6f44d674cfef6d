//! Checkpoint storage
//!
//! A thread's history is an append-only list of checkpoints ordered by
//! sequence. The SQLite [`Database`](crate::db::Database) is the durable
//! implementation; [`MemoryCheckpointStore`] keeps everything in process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::PersistenceError;
use crate::workflow::Checkpoint;

/// Durable, append-only checkpoint history keyed by thread id
pub trait CheckpointStore: Send + Sync {
    /// Checkpoint with the highest sequence for the thread
    fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError>;

    /// Persist a checkpoint; it is durable once this returns `Ok`
    fn append(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;

    /// Every checkpoint of the thread, oldest first
    fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, PersistenceError>;
}

/// In-process checkpoint store
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: Mutex<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn threads(&self) -> MutexGuard<'_, HashMap<String, Vec<Checkpoint>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError> {
        Ok(self
            .threads()
            .get(thread_id)
            .and_then(|history| history.last().cloned()))
    }

    fn append(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let mut threads = self.threads();
        let history = threads.entry(checkpoint.thread_id.clone()).or_default();

        if let Some(last) = history.last() {
            if checkpoint.sequence <= last.sequence {
                return Err(anyhow::anyhow!(
                    "Checkpoint {} for thread '{}' conflicts with stored sequence {}",
                    checkpoint.sequence,
                    checkpoint.thread_id,
                    last.sequence
                )
                .into());
            }
        }

        history.push(checkpoint.clone());
        Ok(())
    }

    fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, PersistenceError> {
        Ok(self.threads().get(thread_id).cloned().unwrap_or_default())
    }
}
