// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire contracts for the dispatched extension points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::User;

/// Extension point consulted before a new account is persisted.
pub const BEFORE_USER_CREATED: &str = "before_user_created";

/// Envelope identifying one invocation; hooks use it for idempotency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookMetadata {
    pub uuid: Uuid,
    pub time: DateTime<Utc>,
    pub name: String,
}

impl HookMetadata {
    pub fn new(name: &str) -> Self {
        HookMetadata {
            uuid: Uuid::new_v4(),
            time: Utc::now(),
            name: name.to_string(),
        }
    }
}

/// Request sent to the before-user-created hook. The user is provisional;
/// nothing has been persisted when the hook sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeforeUserCreatedRequest {
    pub metadata: HookMetadata,
    pub user: User,
}

impl BeforeUserCreatedRequest {
    pub fn new(user: User) -> Self {
        BeforeUserCreatedRequest {
            metadata: HookMetadata::new(BEFORE_USER_CREATED),
            user,
        }
    }
}

/// Accepted output of the before-user-created hook.
///
/// Anything else in the response body is ignored; the embedded `error`
/// convention is handled by the dispatcher before decoding reaches here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeforeUserCreatedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<Map<String, Value>>,
}
