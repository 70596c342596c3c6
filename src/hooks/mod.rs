// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator extension points.
//!
//! Hooks let an operator veto or decorate server decisions without forking
//! the server. The pieces:
//!
//! - [`HookExecutor`] runs a named callable under a time budget
//!   ([`RegistryExecutor`] is the bundled in-process backend),
//! - [`Dispatcher`] adds serialization, the one-transaction-per-dispatch
//!   discipline, and the embedded `{"error": ...}` rejection convention,
//! - [`HookManager`] exposes one typed method per extension point,
//! - [`check_tx`] protects callers that must not already hold a transaction.

mod dispatch;
mod executor;
mod payloads;

pub use dispatch::{check_tx, Dispatcher, HookManager, DEFAULT_HOOK_TIMEOUT_MS};
pub use executor::{ExecutorError, HookExecutor, RegistryExecutor};
pub use payloads::{
    BeforeUserCreatedRequest, BeforeUserCreatedResponse, HookMetadata, BEFORE_USER_CREATED,
};
