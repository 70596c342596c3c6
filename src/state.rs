// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::Config;
use crate::hooks::HookManager;
use crate::storage::AuthStore;
use crate::tokens::SessionIssuer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: AuthStore,
    pub hooks: Arc<HookManager>,
    pub issuer: Arc<dyn SessionIssuer>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: AuthStore,
        hooks: HookManager,
        issuer: impl SessionIssuer + 'static,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            hooks: Arc::new(hooks),
            issuer: Arc::new(issuer),
        }
    }
}
