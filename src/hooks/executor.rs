// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hook execution backends.
//!
//! [`HookExecutor`] is the capability the dispatcher programs against; the
//! bundled [`RegistryExecutor`] runs operator-registered callables on a
//! worker thread with a hard deadline. Other backends (an RPC bridge, a
//! WASM runtime) slot in behind the same trait.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Failure modes of a single hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("no hook registered under \"{0}\"")]
    UnknownHook(String),
    #[error("hook \"{name}\" exceeded its {budget_ms} ms budget")]
    Timeout { name: String, budget_ms: u64 },
    #[error("hook \"{name}\" failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Runs one named hook against a serialized payload within a time budget.
pub trait HookExecutor: Send + Sync {
    fn invoke(&self, name: &str, payload: &[u8], budget: Duration) -> Result<Vec<u8>, ExecutorError>;
}

type HookFn = dyn Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync;

/// In-process executor over operator-registered callables.
///
/// Each invocation runs on its own worker thread so the budget can be
/// enforced with `recv_timeout`. A hook that overruns is left behind
/// detached; its eventual result lands on a closed channel.
#[derive(Default)]
pub struct RegistryExecutor {
    hooks: HashMap<String, Arc<HookFn>>,
}

impl RegistryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(hook));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }
}

impl HookExecutor for RegistryExecutor {
    fn invoke(&self, name: &str, payload: &[u8], budget: Duration) -> Result<Vec<u8>, ExecutorError> {
        let hook = self
            .hooks
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::UnknownHook(name.to_string()))?;

        let payload = payload.to_vec();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(hook(&payload));
        });

        match rx.recv_timeout(budget) {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(reason)) => Err(ExecutorError::Failed {
                name: name.to_string(),
                reason,
            }),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ExecutorError::Timeout {
                name: name.to_string(),
                budget_ms: budget.as_millis() as u64,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ExecutorError::Failed {
                name: name.to_string(),
                reason: "hook panicked".to_string(),
            }),
        }
    }
}
