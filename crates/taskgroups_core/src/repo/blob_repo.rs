//! Durable key-value blob repository contracts and implementations.
//!
//! # Responsibility
//! - Store opaque byte blobs under string keys.
//! - Make multi-key writes atomic for concurrent readers.
//!
//! # Invariants
//! - `write_blobs` publishes all entries or none of them.
//! - Readers never observe a partially written entry set.

use crate::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Result type used by persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors from blob persistence and the save pipeline.
#[derive(Debug)]
pub enum PersistError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Collections could not be encoded.
    Encode(serde_json::Error),
    /// Store refused the write.
    WriteRejected(String),
    /// A thread panicked while holding the store lock.
    LockPoisoned,
    /// Save worker has stopped and no longer accepts jobs.
    WorkerUnavailable,
    /// Snapshots that still failed after a flush retry.
    PendingFailures(usize),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode collections: {err}"),
            Self::WriteRejected(message) => write!(f, "blob write rejected: {message}"),
            Self::LockPoisoned => write!(f, "blob store lock poisoned"),
            Self::WorkerUnavailable => write!(f, "save worker is not running"),
            Self::PendingFailures(count) => {
                write!(f, "{count} snapshot(s) could not be saved")
            }
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PersistError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Repository interface for durable blob storage.
pub trait BlobRepository: Send + Sync {
    /// Reads one blob. Returns `None` when the key was never written.
    fn read_blob(&self, key: &str) -> PersistResult<Option<Vec<u8>>>;
    /// Writes all entries atomically.
    fn write_blobs(&self, entries: &[(String, Vec<u8>)]) -> PersistResult<()>;
}

/// SQLite-backed blob repository.
///
/// The connection is guarded by a mutex so one repository can be shared by
/// the save worker and readers.
pub struct SqliteBlobRepository {
    conn: Mutex<Connection>,
}

impl SqliteBlobRepository {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> PersistResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl BlobRepository for SqliteBlobRepository {
    fn read_blob(&self, key: &str) -> PersistResult<Option<Vec<u8>>> {
        let conn = self.conn.lock().map_err(|_| PersistError::LockPoisoned)?;
        let value = conn
            .query_row(
                "SELECT blob_value FROM kv_blobs WHERE blob_key = ?1;",
                [key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_blobs(&self, entries: &[(String, Vec<u8>)]) -> PersistResult<()> {
        let mut conn = self.conn.lock().map_err(|_| PersistError::LockPoisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv_blobs (blob_key, blob_value, updated_at)
                 VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
                 ON CONFLICT(blob_key) DO UPDATE SET
                    blob_value = excluded.blob_value,
                    updated_at = excluded.updated_at;",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-memory blob repository.
///
/// Useful for hosts without a writable filesystem and for tests; writes can
/// be made to fail on purpose with [`MemoryBlobRepository::set_fail_writes`].
#[derive(Default)]
pub struct MemoryBlobRepository {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBlobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stores raw bytes directly, bypassing the collections encoder.
    pub fn put_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> PersistResult<()> {
        let mut blobs = self.blobs.lock().map_err(|_| PersistError::LockPoisoned)?;
        blobs.insert(key.into(), value.into());
        Ok(())
    }
}

impl BlobRepository for MemoryBlobRepository {
    fn read_blob(&self, key: &str) -> PersistResult<Option<Vec<u8>>> {
        let blobs = self.blobs.lock().map_err(|_| PersistError::LockPoisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn write_blobs(&self, entries: &[(String, Vec<u8>)]) -> PersistResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::WriteRejected(
                "memory store is read-only".to_string(),
            ));
        }
        let mut blobs = self.blobs.lock().map_err(|_| PersistError::LockPoisoned)?;
        for (key, value) in entries {
            blobs.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
