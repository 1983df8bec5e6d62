//! Named blob store contract and implementations.
//!
//! # Responsibility
//! - Provide whole-value get/set by name.
//! - Offer a SQLite-backed store and an in-memory store.
//!
//! # Invariants
//! - `set_blob` replaces the previous body for a name completely.
//! - `SqliteBlobStore::set_blobs` commits all bodies in one transaction.

use crate::db::DbError;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Failure while reading or writing persisted collections.
#[derive(Debug)]
pub enum PersistenceError {
    /// Backend storage failure.
    Db(DbError),
    /// Collection could not be serialized into its blob.
    Serialize {
        blob: String,
        source: serde_json::Error,
    },
    /// Stored blob body is not valid collection JSON.
    CorruptBlob {
        blob: String,
        source: serde_json::Error,
    },
    /// Backend refused the write for a reason of its own (quota, read-only).
    Unavailable(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize { blob, source } => {
                write!(f, "failed to serialize blob `{blob}`: {source}")
            }
            Self::CorruptBlob { blob, source } => write!(f, "corrupt blob `{blob}`: {source}"),
            Self::Unavailable(message) => write!(f, "blob store unavailable: {message}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize { source, .. } | Self::CorruptBlob { source, .. } => Some(source),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-value blob storage addressed by name.
pub trait BlobStore {
    /// Reads one blob; `None` when never written.
    fn get_blob(&self, name: &str) -> PersistenceResult<Option<String>>;
    /// Replaces one blob.
    fn set_blob(&mut self, name: &str, body: &str) -> PersistenceResult<()>;

    /// Writes several blobs.
    ///
    /// The default writes them one after another, so a failure part-way
    /// leaves earlier blobs written.
    fn set_blobs(&mut self, blobs: &[(&str, &str)]) -> PersistenceResult<()> {
        for (name, body) in blobs {
            self.set_blob(name, body)?;
        }
        Ok(())
    }
}

/// SQLite-backed blob store over a migrated connection.
pub struct SqliteBlobStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteBlobStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl BlobStore for SqliteBlobStore<'_> {
    fn get_blob(&self, name: &str) -> PersistenceResult<Option<String>> {
        let body = self
            .conn
            .query_row("SELECT body FROM blobs WHERE name = ?1;", [name], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        debug!(
            "event=blob_get module=repo status=ok name={} found={}",
            name,
            body.is_some()
        );
        Ok(body)
    }

    fn set_blob(&mut self, name: &str, body: &str) -> PersistenceResult<()> {
        upsert_blob(self.conn, name, body)?;
        Ok(())
    }

    fn set_blobs(&mut self, blobs: &[(&str, &str)]) -> PersistenceResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (name, body) in blobs {
            if let Err(err) = upsert_blob(&tx, name, body) {
                error!(
                    "event=blob_set module=repo status=error name={} error={}",
                    name, err
                );
                return Err(err.into());
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_blob(conn: &Connection, name: &str, body: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO blobs (name, body, updated_at)
         VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
         ON CONFLICT(name) DO UPDATE SET
            body = excluded.body,
            updated_at = excluded.updated_at;",
        params![name, body],
    )?;
    Ok(())
}

/// Process-local blob store, used by tests and embedders without a file.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of blobs written so far.
    pub fn names(&self) -> Vec<&str> {
        self.blobs.keys().map(String::as_str).collect()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get_blob(&self, name: &str) -> PersistenceResult<Option<String>> {
        Ok(self.blobs.get(name).cloned())
    }

    fn set_blob(&mut self, name: &str, body: &str) -> PersistenceResult<()> {
        self.blobs.insert(name.to_string(), body.to_string());
        Ok(())
    }
}
