// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Storage Module
//!
//! Persistent storage for users, identities, and invites on top of redb, a
//! pure-Rust embedded ACID database. One file under `DATA_DIR` holds every
//! table.
//!
//! ## Transaction Discipline
//!
//! All reads and writes go through an explicit [`StoreTx`], obtained from
//! [`Connection::transaction`]. redb runs a single writer at a time, which the
//! account-linking engine relies on: two concurrent signups for the same
//! external identity serialize, and the loser either re-reads the winner's row
//! or fails its insert with [`StoreError::AlreadyExists`].
//!
//! Transactions never nest. Code paths that must not run inside an open
//! transaction (hook triggering) check [`Connection::in_transaction`] up
//! front, since a nested `begin_write` would deadlock rather than fail.

mod db;
mod invites;
mod users;

pub use db::{AuthStore, Connection, StoreError, StoreResult, StoreTx};
