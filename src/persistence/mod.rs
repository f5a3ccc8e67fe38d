//! Persistence module for login history
//!
//! This module provides durable, per-subject, size-bounded storage of past
//! logins so that detection survives daemon restarts.

pub mod sqlite_store;

pub use sqlite_store::SqliteHistoryStore;

use crate::models::{HistoryStats, LoginRecord, NewLoginRecord};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Storage operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Trait for login history backends
///
/// History is append-and-evict only: records are never updated and there is
/// no delete-by-id. Callers that need read-decide-write atomicity per subject
/// must serialize around `latest` and `insert` themselves.
pub trait HistoryStore: Send + Sync {
    /// Most recent login for a subject by event timestamp
    fn latest(&self, subject: &str) -> Result<Option<LoginRecord>, PersistenceError>;

    /// Append a login, then evict the subject's oldest logins beyond
    /// `max_records` in the same transaction
    ///
    /// # Arguments
    ///
    /// * `record` - The login to store
    /// * `max_records` - Per-subject cap; the oldest by event timestamp go first,
    ///   which may include `record` itself when it is older than all others
    ///
    /// # Returns
    ///
    /// Returns the number of evicted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is then inserted or evicted.
    fn insert(&self, record: &NewLoginRecord, max_records: usize) -> Result<usize, PersistenceError>;

    /// Up to `limit` logins for a subject, newest first
    fn recent(&self, subject: &str, limit: usize) -> Result<Vec<LoginRecord>, PersistenceError>;

    /// Delete every record, returning how many were removed
    fn purge_all(&self) -> Result<usize, PersistenceError>;

    fn stats(&self) -> Result<HistoryStats, PersistenceError>;
}
