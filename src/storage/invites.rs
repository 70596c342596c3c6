// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Invite queries on an open [`StoreTx`].

use redb::ReadableTable;

use crate::models::Invite;

use super::db::{StoreError, StoreResult, StoreTx, INVITES};

impl StoreTx {
    /// Look up an invite by its token.
    pub fn find_invite(&self, token: &str) -> StoreResult<Option<Invite>> {
        let table = self.inner.open_table(INVITES)?;
        let found = match table.get(token)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        };
        found
    }

    /// Store a freshly issued invite. Fails if the token is already taken.
    pub fn create_invite(&mut self, invite: &Invite) -> StoreResult<()> {
        let json = serde_json::to_vec(invite)?;
        let mut table = self.inner.open_table(INVITES)?;
        if table.get(invite.token.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("invite {}", invite.token)));
        }
        table.insert(invite.token.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Persist changes to an existing invite (acceptance bookkeeping).
    pub fn update_invite(&mut self, invite: &Invite) -> StoreResult<()> {
        let json = serde_json::to_vec(invite)?;
        let mut table = self.inner.open_table(INVITES)?;
        if table.get(invite.token.as_str())?.is_none() {
            return Err(StoreError::NotFound(format!("invite {}", invite.token)));
        }
        table.insert(invite.token.as_str(), json.as_slice())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthStore;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn invite_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(&dir.path().join("auth.redb")).unwrap();
        let conn = store.connection();

        conn.transaction(|tx| -> StoreResult<()> {
            let invite = Invite::new("tok-1", "invitee@example.com", "authenticated");
            tx.create_invite(&invite)?;
            assert!(tx.find_invite("tok-1")?.is_some());
            assert!(tx.find_invite("tok-2")?.is_none());

            let mut accepted = tx.find_invite("tok-1")?.unwrap();
            accepted.accept(Uuid::new_v4(), Utc::now());
            tx.update_invite(&accepted)?;

            assert!(tx.find_invite("tok-1")?.unwrap().is_accepted());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn duplicate_invite_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(&dir.path().join("auth.redb")).unwrap();
        let conn = store.connection();

        let result = conn.transaction(|tx| {
            tx.create_invite(&Invite::new("tok-1", "a@b.c", "authenticated"))?;
            tx.create_invite(&Invite::new("tok-1", "x@y.z", "authenticated"))
        });
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }
}
