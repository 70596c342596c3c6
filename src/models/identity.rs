// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External identity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

/// The binding of one external `(provider, provider_id)` pair to a local user.
///
/// Exactly one identity may exist per pair; the storage layer enforces this
/// with a unique key. `identity_data` is the flattened claim document captured
/// at the most recent sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Unique identifier.
    pub id: Uuid,
    /// User this identity belongs to.
    pub user_id: Uuid,
    /// Provider name, e.g. `solana` or `github`.
    pub provider: String,
    /// Subject identifier issued by the provider (wallet address, OAuth `sub`).
    pub provider_id: String,
    /// Flattened claims captured at the last sign-in.
    #[schema(value_type = Object)]
    pub identity_data: Map<String, Value>,
    /// Lower-cased copy of `identity_data.email`, if present.
    pub email: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Most recent sign-in through this identity.
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Bind a new external identity to `user_id`.
    pub fn new(
        user_id: Uuid,
        provider: &str,
        provider_id: &str,
        identity_data: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        let email = extract_email(&identity_data);
        Identity {
            id: Uuid::new_v4(),
            user_id,
            provider: provider.to_string(),
            provider_id: provider_id.to_string(),
            identity_data,
            email,
            created_at: now,
            updated_at: now,
            last_sign_in_at: Some(now),
        }
    }

    /// Replace the captured claims with the ones from a fresh sign-in.
    pub fn update_claims(&mut self, identity_data: Map<String, Value>, now: DateTime<Utc>) {
        self.email = extract_email(&identity_data);
        self.identity_data = identity_data;
        self.last_sign_in_at = Some(now);
        self.updated_at = now;
    }

    /// The identity's email when the provider attested it as verified.
    pub fn verified_email(&self) -> Option<&str> {
        let verified = self
            .identity_data
            .get("email_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if verified {
            self.email.as_deref()
        } else {
            None
        }
    }
}

fn extract_email(identity_data: &Map<String, Value>) -> Option<String> {
    identity_data
        .get("email")
        .and_then(Value::as_str)
        .map(|e| e.to_lowercase())
}
