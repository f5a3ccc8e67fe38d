//! SQLite implementation of the HistoryStore trait

use super::{HistoryStore, PersistenceError};
use crate::models::{HistoryStats, Location, LoginRecord, NewLoginRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SELECT_COLUMNS: &str =
    "SELECT id, subject, source_ip, country, city, latitude, longitude, timestamp, recorded_at
     FROM login_history";

/// SQLite-based login history
///
/// All rows live in a single `login_history` table indexed on
/// `(subject, timestamp_ms DESC)`, which serves both `latest` and eviction.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

/// Columns as read from SQLite, before timestamp parsing
struct RawRecord {
    id: i64,
    subject: String,
    source_ip: String,
    country: String,
    city: String,
    latitude: f64,
    longitude: f64,
    timestamp: String,
    recorded_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRecord {
            id: row.get(0)?,
            subject: row.get(1)?,
            source_ip: row.get(2)?,
            country: row.get(3)?,
            city: row.get(4)?,
            latitude: row.get(5)?,
            longitude: row.get(6)?,
            timestamp: row.get(7)?,
            recorded_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<LoginRecord, PersistenceError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp).map_err(|_| {
            PersistenceError::InvalidData(format!("Invalid timestamp: {}", self.timestamp))
        })?;
        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map_err(|_| {
                PersistenceError::InvalidData(format!("Invalid recorded_at: {}", self.recorded_at))
            })?
            .with_timezone(&Utc);

        Ok(LoginRecord {
            id: self.id,
            subject: self.subject,
            source_ip: self.source_ip,
            location: Location {
                country: self.country,
                city: self.city,
                latitude: self.latitude,
                longitude: self.longitude,
            },
            timestamp,
            recorded_at,
        })
    }
}

impl SqliteHistoryStore {
    /// Open (or create) a history database at the specified path
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file
    /// * `busy_timeout` - How long a statement waits on a locked database
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the database cannot
    /// be opened, or the schema cannot be applied.
    pub fn new<P: AsRef<Path>>(db_path: P, busy_timeout: Duration) -> Result<Self, PersistenceError> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = SqliteHistoryStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        log::info!("History database initialized at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteHistoryStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::LockPoisoned)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn latest(&self, subject: &str) -> Result<Option<LoginRecord>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE subject = ?1 ORDER BY timestamp_ms DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        ))?;

        let raw = stmt
            .query_row(params![subject], RawRecord::from_row)
            .optional()?;

        raw.map(RawRecord::into_record).transpose()
    }

    fn insert(&self, record: &NewLoginRecord, max_records: usize) -> Result<usize, PersistenceError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO login_history
             (subject, source_ip, country, city, latitude, longitude, timestamp, timestamp_ms, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.subject,
                record.source_ip,
                record.location.country,
                record.location.city,
                record.location.latitude,
                record.location.longitude,
                record.timestamp.to_rfc3339(),
                record.timestamp.timestamp_millis(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM login_history WHERE subject = ?1",
            params![record.subject],
            |row| row.get(0),
        )?;

        let excess = (count as usize).saturating_sub(max_records);
        let evicted = if excess > 0 {
            tx.execute(
                "DELETE FROM login_history WHERE id IN (
                     SELECT id FROM login_history
                     WHERE subject = ?1
                     ORDER BY timestamp_ms ASC, id ASC
                     LIMIT ?2
                 )",
                params![record.subject, excess],
            )?
        } else {
            0
        };

        tx.commit()?;

        if evicted > 0 {
            log::debug!("Evicted {} old records for user {}", evicted, record.subject);
        }
        log::info!(
            "Added login record for user {} from IP {}",
            record.subject,
            record.source_ip
        );
        Ok(evicted)
    }

    fn recent(&self, subject: &str, limit: usize) -> Result<Vec<LoginRecord>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE subject = ?1 ORDER BY timestamp_ms DESC, id DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;

        let raws = stmt
            .query_map(params![subject, limit], RawRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raws.into_iter().map(RawRecord::into_record).collect()
    }

    fn purge_all(&self) -> Result<usize, PersistenceError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM login_history", [])?;
        log::warn!("Purged {} records from database", deleted);
        Ok(deleted)
    }

    fn stats(&self) -> Result<HistoryStats, PersistenceError> {
        let conn = self.lock()?;
        let (total, unique): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT subject) FROM login_history",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(HistoryStats {
            total_records: total as usize,
            unique_users: unique as usize,
        })
    }
}
