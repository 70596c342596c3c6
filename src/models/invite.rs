// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signup invitation model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A single-use signup invitation, keyed by its opaque token.
///
/// An invite is bound to one email address within one audience and can be
/// accepted at most once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Invite {
    /// Opaque token shared with the invitee.
    pub token: String,
    /// Email address the invite was issued for (lower case).
    pub email: String,
    /// Audience the resulting account will belong to.
    pub aud: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the invite was accepted, if it was.
    pub accepted_at: Option<DateTime<Utc>>,
    /// User created or linked through this invite.
    pub accepted_by_user_id: Option<Uuid>,
}

impl Invite {
    /// Issue a new invite for `email` in `aud`.
    pub fn new(token: &str, email: &str, aud: &str) -> Self {
        Invite {
            token: token.to_string(),
            email: email.to_lowercase(),
            aud: aud.to_string(),
            created_at: Utc::now(),
            accepted_at: None,
            accepted_by_user_id: None,
        }
    }

    /// Whether the invite has already been used.
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    /// Case-insensitive comparison against the invited address.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email == email.to_lowercase()
    }

    /// Record acceptance by `user_id`.
    pub fn accept(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        self.accepted_at = Some(now);
        self.accepted_by_user_id = Some(user_id);
    }
}
