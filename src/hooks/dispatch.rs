// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Extension call dispatch and its transaction discipline.
//!
//! A dispatch occupies exactly one transaction: callers already inside one
//! lend it via `Some(tx)`, everyone else lets the dispatcher open its own
//! single-call boundary. Opening a second write transaction on the store
//! would deadlock, so the shape of the call site is part of the contract.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{HookConfig, HooksConfig};
use crate::error::{codes, ApiError};
use crate::storage::{Connection, StoreTx};

use super::executor::{ExecutorError, HookExecutor};
use super::payloads::{BeforeUserCreatedRequest, BeforeUserCreatedResponse, BEFORE_USER_CREATED};

/// Budget applied when a hook's configured timeout is `0`.
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 2_000;

/// Guard for controllers that are about to trigger a hook which manages its
/// own transaction. Must run before any transaction opens.
pub fn check_tx(conn: &Connection) -> Result<(), ApiError> {
    if conn.in_transaction() {
        return Err(ApiError::internal(
            "unable to trigger hooks during transaction",
        ));
    }
    Ok(())
}

/// Serializes requests, enforces budgets, and applies the embedded error
/// convention to whatever the executor returns.
pub struct Dispatcher {
    executor: Arc<dyn HookExecutor>,
    default_budget: Duration,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn HookExecutor>) -> Self {
        Dispatcher {
            executor,
            default_budget: Duration::from_millis(DEFAULT_HOOK_TIMEOUT_MS),
        }
    }

    fn budget(&self, cfg: &HookConfig) -> Duration {
        if cfg.timeout_ms == 0 {
            self.default_budget
        } else {
            Duration::from_millis(cfg.timeout_ms)
        }
    }

    /// Run one hook call and return its raw response bytes.
    ///
    /// `tx: Some` reuses the caller's open transaction as the call boundary;
    /// `None` opens one around just this call.
    pub fn dispatch<R: Serialize>(
        &self,
        conn: &Connection,
        cfg: &HookConfig,
        tx: Option<&mut StoreTx>,
        request: &R,
    ) -> Result<Vec<u8>, ApiError> {
        let payload = serde_json::to_vec(request)
            .map_err(|err| ApiError::internal(format!("serializing hook request: {err}")))?;
        let budget = self.budget(cfg);

        tracing::debug!(hook = %cfg.hook_name, budget_ms = budget.as_millis() as u64, "dispatching hook");
        let raw = if tx.is_some() {
            self.call(cfg, &payload, budget)?
        } else {
            conn.transaction(|_tx| self.call(cfg, &payload, budget))?
        };

        reject_embedded_error(&raw)?;
        Ok(raw)
    }

    fn call(&self, cfg: &HookConfig, payload: &[u8], budget: Duration) -> Result<Vec<u8>, ApiError> {
        self.executor
            .invoke(&cfg.hook_name, payload, budget)
            .map_err(|err| match err {
                ExecutorError::Timeout { .. } => {
                    tracing::warn!(hook = %cfg.hook_name, "hook exceeded its budget");
                    ApiError::Hook {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        code: Some(codes::HOOK_TIMEOUT.to_string()),
                        msg: "Hook exceeded maximum allowed execution time".to_string(),
                    }
                }
                other => ApiError::internal(other.to_string()),
            })
    }
}

#[derive(Deserialize)]
struct EmbeddedError {
    #[serde(default)]
    http_code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// Hooks reject a request by answering `{"error": {"http_code"?, "message",
/// "error_code"?}}` instead of a success payload. A non-object `error` value
/// or an empty message does not count as a rejection.
fn reject_embedded_error(raw: &[u8]) -> Result<(), ApiError> {
    let Ok(body) = serde_json::from_slice::<Value>(raw) else {
        return Ok(());
    };
    let Some(error) = body.get("error") else {
        return Ok(());
    };
    let Ok(rejection) = serde_json::from_value::<EmbeddedError>(error.clone()) else {
        return Ok(());
    };
    if rejection.message.is_empty() {
        return Ok(());
    }
    let status = rejection
        .http_code
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Err(ApiError::Hook {
        status,
        code: rejection.error_code,
        msg: rejection.message,
    })
}

/// Configured view over the dispatcher; one method per extension point.
pub struct HookManager {
    config: HooksConfig,
    dispatcher: Dispatcher,
}

impl HookManager {
    pub fn new(config: HooksConfig, executor: Arc<dyn HookExecutor>) -> Self {
        HookManager {
            config,
            dispatcher: Dispatcher::new(executor),
        }
    }

    /// Whether the named extension point is switched on.
    pub fn enabled(&self, name: &str) -> bool {
        match name {
            BEFORE_USER_CREATED => self.config.before_user_created.enabled,
            _ => false,
        }
    }

    /// Invoke the before-user-created hook and decode its typed response.
    pub fn before_user_created(
        &self,
        conn: &Connection,
        tx: Option<&mut StoreTx>,
        request: &BeforeUserCreatedRequest,
    ) -> Result<BeforeUserCreatedResponse, ApiError> {
        let raw = self
            .dispatcher
            .dispatch(conn, &self.config.before_user_created, tx, request)?;
        if raw.is_empty() {
            return Ok(BeforeUserCreatedResponse::default());
        }
        serde_json::from_slice(&raw).map_err(|err| {
            ApiError::internal(format!("decoding {BEFORE_USER_CREATED} hook response: {err}"))
        })
    }
}
