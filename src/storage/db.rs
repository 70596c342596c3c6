// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded account database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized User
//! - `identities`: composite key (provider|provider_id) → serialized Identity
//! - `invites`: invite token → serialized Invite
//!
//! redb serializes write transactions, so every transaction observes a single
//! consistent snapshot and two racing signups for the same external identity
//! resolve deterministically: the second writer re-reads the winner's row or
//! fails its insert with [`StoreError::AlreadyExists`].

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id (uuid string) → serialized User (JSON bytes).
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique identity table: `provider|provider_id` → serialized Identity.
/// Neither provider names nor provider subjects may contain `|`.
pub(crate) const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Invite table: token → serialized Invite.
pub(crate) const INVITES: TableDefinition<&str, &[u8]> = TableDefinition::new("invites");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// AuthStore
// =============================================================================

/// Embedded ACID account store.
#[derive(Clone)]
pub struct AuthStore {
    db: Arc<Database>,
}

impl AuthStore {
    /// Open the database at `path`, creating it and its parent directory on
    /// first use.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Read snapshots fail on tables that have never been opened, so
        // create all three up front.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(INVITES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Hand out a connection handle for one request.
    pub fn connection(&self) -> Connection {
        Connection {
            db: self.db.clone(),
            in_transaction: false,
        }
    }

    /// Cheap readiness probe: open a read snapshot and the users table.
    pub fn probe(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        read_txn.open_table(USERS)?;
        Ok(())
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Per-request handle onto the store.
///
/// `in_transaction` tracks whether this handle was derived from an open
/// transaction. Code that must run outside any transaction (the hook trigger
/// path) checks the flag instead of relying on ambient state.
#[derive(Clone)]
pub struct Connection {
    db: Arc<Database>,
    in_transaction: bool,
}

impl Connection {
    /// Whether this handle was derived from an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// A handle representing this connection while one of its transactions is
    /// open. Passing such a handle into code that opens transactions of its
    /// own would deadlock on redb's single writer, so callees guard on
    /// [`in_transaction`](Self::in_transaction).
    pub fn tx_bound(&self) -> Connection {
        Connection {
            db: self.db.clone(),
            in_transaction: true,
        }
    }

    /// Run `f` inside a write transaction.
    ///
    /// Commits when `f` returns `Ok`, aborts (drops the transaction) when it
    /// returns `Err`. Nested use on one thread deadlocks; see
    /// [`tx_bound`](Self::tx_bound).
    pub fn transaction<T, E>(&self, f: impl FnOnce(&mut StoreTx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| E::from(StoreError::from(e)))?;
        let mut tx = StoreTx { inner: write_txn };
        match f(&mut tx) {
            Ok(value) => {
                tx.inner
                    .commit()
                    .map_err(|e| E::from(StoreError::from(e)))?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }
}

/// An open write transaction with the query surface of the store.
///
/// Queries live in `users.rs` and `invites.rs`; this type only owns the redb
/// transaction. Dropping it without commit aborts every change.
pub struct StoreTx {
    pub(crate) inner: redb::WriteTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, User};

    fn temp_store() -> (AuthStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(&dir.path().join("auth.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn transaction_commits_on_ok() {
        let (store, _dir) = temp_store();
        let conn = store.connection();

        let user = User::new("authenticated", None, serde_json::Map::new());
        let id = user.id;
        conn.transaction(|tx| tx.create_user(&user)).unwrap();

        let found = conn.transaction(|tx| tx.find_user(id)).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn transaction_aborts_on_err() {
        let (store, _dir) = temp_store();
        let conn = store.connection();

        let user = User::new("authenticated", None, serde_json::Map::new());
        let id = user.id;
        let result = conn.transaction(|tx| -> StoreResult<()> {
            tx.create_user(&user)?;
            Err(StoreError::NotFound("forced rollback".to_string()))
        });
        assert!(result.is_err());

        let found = conn.transaction(|tx| tx.find_user(id)).unwrap();
        assert!(found.is_none(), "aborted insert must not persist");
    }

    #[test]
    fn probe_succeeds_on_a_fresh_store() {
        let (store, _dir) = temp_store();
        store.probe().unwrap();
    }

    #[test]
    fn tx_bound_handles_report_in_transaction() {
        let (store, _dir) = temp_store();
        let conn = store.connection();
        assert!(!conn.in_transaction());
        assert!(conn.tx_bound().in_transaction());
    }

    #[test]
    fn racing_identity_creates_leave_exactly_one_row() {
        let (store, _dir) = temp_store();
        let provider = "solana";
        let provider_id = "9pStGkfG4TfFkk5VBwaP6XPLVXr8mq6uWfFJcchWHdwP";

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                let conn = store.connection();
                conn.transaction(|tx| -> StoreResult<bool> {
                    if tx.find_identity(provider, provider_id)?.is_some() {
                        return Ok(false);
                    }
                    let user = User::new("authenticated", None, serde_json::Map::new());
                    let identity =
                        Identity::new(user.id, provider, provider_id, serde_json::Map::new());
                    tx.create_user(&user)?;
                    tx.create_identity(&identity)?;
                    Ok(true)
                })
            }));
        }

        let created: Vec<bool> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert_eq!(
            created.iter().filter(|c| **c).count(),
            1,
            "exactly one racer may create the identity"
        );

        let conn = store.connection();
        let identity = conn
            .transaction(|tx| tx.find_identity(provider, provider_id))
            .unwrap();
        assert!(identity.is_some());
    }
}
