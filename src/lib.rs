// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Auth - Identity Resolution Service
//!
//! This crate verifies externally signed identity claims (Sign-In-With-Solana
//! messages), resolves each verified claim onto a local account (create, link,
//! or sign in), and lets operator-defined hooks intercept account creation
//! before it is committed.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `siws` - Sign-In-With-Solana message parsing and validation
//! - `provider` - External identity providers (Solana wallet grant)
//! - `models` - Account, identity, and invite records plus the linking engine
//! - `hooks` - Operator hook dispatch (before-user-created)
//! - `storage` - Embedded account database (redb)

pub mod api;
pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod provider;
pub mod siws;
pub mod state;
pub mod storage;
pub mod tokens;
