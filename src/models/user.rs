// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role assigned to every account created through the public signup paths.
pub const DEFAULT_ROLE: &str = "authenticated";

/// A local account.
///
/// Users are scoped to an audience (`aud`); the same email may exist in two
/// audiences as two unrelated accounts. `is_sso_user` marks accounts created
/// through an SSO-configured domain, which removes them from ordinary
/// email-based linking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Audience this account belongs to.
    pub aud: String,
    /// Access role, `authenticated` for all signup paths.
    pub role: String,
    /// Primary email address (lower case), if any.
    pub email: Option<String>,
    /// When the primary email was confirmed, if it was.
    pub email_confirmed_at: Option<DateTime<Utc>>,
    /// When the account was invited, for invite-driven signups.
    pub invited_at: Option<DateTime<Utc>>,
    /// Most recent successful sign-in.
    pub last_sign_in_at: Option<DateTime<Utc>>,
    /// Server-controlled metadata (`provider`, `providers`).
    #[schema(value_type = Object)]
    pub app_metadata: Map<String, Value>,
    /// Profile metadata sourced from identity providers.
    #[schema(value_type = Object)]
    pub user_metadata: Map<String, Value>,
    /// True when the account was created through an SSO-configured domain.
    pub is_sso_user: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh account for the given audience.
    ///
    /// The email, when present, is stored lower-cased; confirmation state is
    /// set separately by the caller once the address is known to be verified.
    pub fn new(aud: &str, email: Option<String>, user_metadata: Map<String, Value>) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            aud: aud.to_string(),
            role: DEFAULT_ROLE.to_string(),
            email: email.map(|e| e.to_lowercase()),
            email_confirmed_at: None,
            invited_at: None,
            last_sign_in_at: None,
            app_metadata: Map::new(),
            user_metadata,
            is_sso_user: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the primary email as confirmed.
    pub fn confirm_email(&mut self, now: DateTime<Utc>) {
        if self.email_confirmed_at.is_none() {
            self.email_confirmed_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Whether the primary email has been confirmed.
    pub fn has_confirmed_email(&self) -> bool {
        self.email.is_some() && self.email_confirmed_at.is_some()
    }

    /// Record a successful sign-in.
    pub fn touch_sign_in(&mut self, now: DateTime<Utc>) {
        self.last_sign_in_at = Some(now);
        self.updated_at = now;
    }

    /// Record `provider` in the server-controlled metadata.
    ///
    /// `app_metadata.provider` holds the first provider the account signed up
    /// with; `app_metadata.providers` accumulates every provider linked since.
    pub fn add_provider(&mut self, provider: &str, now: DateTime<Utc>) {
        if !self.app_metadata.contains_key("provider") {
            self.app_metadata
                .insert("provider".to_string(), Value::String(provider.to_string()));
        }
        let providers = self
            .app_metadata
            .entry("providers".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = providers {
            if !list.iter().any(|p| p.as_str() == Some(provider)) {
                list.push(Value::String(provider.to_string()));
            }
        }
        self.updated_at = now;
    }

    /// Merge provider-supplied profile fields into the user metadata.
    ///
    /// Existing keys are overwritten; a `Value::Null` removes the key.
    pub fn merge_user_metadata(&mut self, updates: &Map<String, Value>, now: DateTime<Utc>) {
        for (key, value) in updates {
            if value.is_null() {
                self.user_metadata.remove(key);
            } else {
                self.user_metadata.insert(key.clone(), value.clone());
            }
        }
        self.updated_at = now;
    }

    /// Merge server-controlled fields, same overwrite semantics as
    /// [`merge_user_metadata`](Self::merge_user_metadata).
    pub fn merge_app_metadata(&mut self, updates: &Map<String, Value>, now: DateTime<Utc>) {
        for (key, value) in updates {
            if value.is_null() {
                self.app_metadata.remove(key);
            } else {
                self.app_metadata.insert(key.clone(), value.clone());
            }
        }
        self.updated_at = now;
    }
}
