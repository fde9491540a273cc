// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded marketplace database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `courses`: course_id → serialized StoredCourse
//! - `accounts`: account_id → serialized StoredAccount
//! - `account_external_ids`: identity provider subject → account_id
//! - `account_emails`: lowercase email → account_id
//! - `quotes`: gateway order_id → serialized StoredQuote
//! - `audit_events`: `date|micros|event_id` → serialized AuditEvent
//!
//! redb admits a single write transaction at a time, so every mutation that
//! touches more than one record (enrollment, deletes, unique index checks)
//! runs inside one `WriteTransaction` and commits all-or-nothing.

use std::path::{Path, PathBuf};

use redb::{ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const COURSES: TableDefinition<&str, &[u8]> = TableDefinition::new("courses");

pub(crate) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Unique index: identity provider subject → account_id.
pub(crate) const ACCOUNT_EXTERNAL_IDS: TableDefinition<&str, &str> =
    TableDefinition::new("account_external_ids");

/// Unique index: lowercase email → account_id.
pub(crate) const ACCOUNT_EMAILS: TableDefinition<&str, &str> =
    TableDefinition::new("account_emails");

pub(crate) const QUOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("quotes");

pub(crate) const AUDIT_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("audit_events");

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "marketplace.redb";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("permission denied: account {actor_id} cannot modify {resource}")]
    PermissionDenied { actor_id: String, resource: String },
}

impl StoreError {
    /// True for failures of the underlying store rather than of the request.
    ///
    /// These are the retryable ones: the same request may succeed once the
    /// database is reachable again.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Redb(_)
                | StoreError::RedbDatabase(_)
                | StoreError::RedbTransaction(_)
                | StoreError::RedbTable(_)
                | StoreError::RedbStorage(_)
                | StoreError::RedbCommit(_)
                | StoreError::Io(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the marketplace database.
pub struct Database {
    db: redb::Database,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(COURSES)?;
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_EXTERNAL_IDS)?;
            let _ = write_txn.open_table(ACCOUNT_EMAILS)?;
            let _ = write_txn.open_table(QUOTES)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Marketplace database opened");

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Open the database file inside a data directory.
    pub fn open_in_dir(data_dir: &Path) -> StoreResult<Self> {
        Self::open(&data_dir.join(DATABASE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub(crate) fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COURSES)?;
        let _ = table.first()?;
        Ok(())
    }
}

// =============================================================================
// JSON record helpers
// =============================================================================

/// Read and deserialize a JSON record from any readable table.
pub(crate) fn get_json<T, R>(table: &R, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON record.
pub(crate) fn put_json<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let json = serde_json::to_vec(value)?;
    table.insert(key, json.as_slice())?;
    Ok(())
}

/// Deserialize every record of a table, in key order.
pub(crate) fn all_json<T, R>(table: &R) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;

    /// Fresh database in a temp directory; keep the guard alive for the test.
    pub fn temp_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        (db, dir)
    }
}
