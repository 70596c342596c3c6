// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User and identity queries on an open [`StoreTx`].

use redb::ReadableTable;
use uuid::Uuid;

use crate::models::{Identity, User};

use super::db::{StoreError, StoreResult, StoreTx, IDENTITIES, USERS};

/// Composite key for the identity table. Provider names and provider subjects
/// never contain `|`.
fn identity_key(provider: &str, provider_id: &str) -> String {
    format!("{provider}|{provider_id}")
}

impl StoreTx {
    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user by id.
    pub fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let table = self.inner.open_table(USERS)?;
        let key = id.to_string();
        let found = match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        };
        found
    }

    /// Insert a new user. Fails if the id is already taken.
    pub fn create_user(&mut self, user: &User) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let key = user.id.to_string();
        let mut table = self.inner.open_table(USERS)?;
        if table.get(key.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("user {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Persist changes to an existing user.
    pub fn update_user(&mut self, user: &User) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let key = user.id.to_string();
        let mut table = self.inner.open_table(USERS)?;
        if table.get(key.as_str())?.is_none() {
            return Err(StoreError::NotFound(format!("user {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    // =========================================================================
    // Identities
    // =========================================================================

    /// Look up the identity bound to `(provider, provider_id)`.
    pub fn find_identity(&self, provider: &str, provider_id: &str) -> StoreResult<Option<Identity>> {
        let table = self.inner.open_table(IDENTITIES)?;
        let key = identity_key(provider, provider_id);
        let found = match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        };
        found
    }

    /// Bind a new identity. Fails if `(provider, provider_id)` is already
    /// bound to any user; that uniqueness is what makes racing signups safe.
    pub fn create_identity(&mut self, identity: &Identity) -> StoreResult<()> {
        let json = serde_json::to_vec(identity)?;
        let key = identity_key(&identity.provider, &identity.provider_id);
        let mut table = self.inner.open_table(IDENTITIES)?;
        if table.get(key.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("identity {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Persist changes to an existing identity.
    pub fn update_identity(&mut self, identity: &Identity) -> StoreResult<()> {
        let json = serde_json::to_vec(identity)?;
        let key = identity_key(&identity.provider, &identity.provider_id);
        let mut table = self.inner.open_table(IDENTITIES)?;
        if table.get(key.as_str())?.is_none() {
            return Err(StoreError::NotFound(format!("identity {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    // =========================================================================
    // Email search
    // =========================================================================

    /// Users in `aud` reachable through any of `emails`.
    ///
    /// A user matches when their confirmed primary email is in the list, or
    /// when one of their identities carries a provider-verified email from the
    /// list. SSO-provisioned users are excluded: they never take part in
    /// email-based linking. The result is sorted by creation time then id so
    /// callers observe a stable order.
    pub fn find_users_with_verified_email(
        &self,
        aud: &str,
        emails: &[String],
    ) -> StoreResult<Vec<User>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let identities = self.inner.open_table(IDENTITIES)?;
        let mut matched_user_ids: Vec<Uuid> = Vec::new();
        for entry in identities.iter()? {
            let (_key, value) = entry?;
            let identity: Identity = serde_json::from_slice(value.value())?;
            if let Some(email) = identity.verified_email() {
                if emails.iter().any(|candidate| candidate == email) {
                    matched_user_ids.push(identity.user_id);
                }
            }
        }

        let users = self.inner.open_table(USERS)?;
        let mut result: Vec<User> = Vec::new();
        for entry in users.iter()? {
            let (_key, value) = entry?;
            let user: User = serde_json::from_slice(value.value())?;
            if user.aud != aud || user.is_sso_user {
                continue;
            }
            let direct_match = user.has_confirmed_email()
                && user
                    .email
                    .as_deref()
                    .is_some_and(|email| emails.iter().any(|candidate| candidate == email));
            if direct_match || matched_user_ids.contains(&user.id) {
                result.push(user);
            }
        }

        result.sort_by_key(|user| (user.created_at, user.id));
        Ok(result)
    }
}
