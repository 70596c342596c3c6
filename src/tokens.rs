// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session issuance.
//!
//! Token cryptography is a collaborator concern. Handlers only need
//! something that can turn an authenticated [`User`] into a token grant
//! response; deployments wanting JWTs or server-side sessions plug their
//! own [`SessionIssuer`] into the app state.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::User;

/// OAuth-style response of a successful token grant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    pub refresh_token: String,
    pub user: User,
}

/// Issues a session for a user that has already been authenticated.
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, user: &User) -> AccessTokenResponse;
}

/// Mints opaque uuid tokens with a fixed lifetime.
///
/// Enough to run the server end-to-end; the tokens carry no claims and are
/// only as good as whatever stores them.
pub struct OpaqueSessionIssuer {
    expires_in: u64,
}

impl OpaqueSessionIssuer {
    pub fn new(expires_in: u64) -> Self {
        OpaqueSessionIssuer { expires_in }
    }
}

impl Default for OpaqueSessionIssuer {
    fn default() -> Self {
        OpaqueSessionIssuer::new(3600)
    }
}

impl SessionIssuer for OpaqueSessionIssuer {
    fn issue(&self, user: &User) -> AccessTokenResponse {
        AccessTokenResponse {
            access_token: Uuid::new_v4().to_string(),
            token_type: "bearer".to_string(),
            expires_in: self.expires_in,
            refresh_token: Uuid::new_v4().to_string(),
            user: user.clone(),
        }
    }
}
