// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Data Models
//!
//! Account records and the decision logic that maps external identities onto
//! them:
//!
//! - **User**: a local account scoped to an audience
//! - **Identity**: the binding of one external `(provider, subject)` pair to a user
//! - **Invite**: a single-use signup invitation
//! - **Linking**: the create / link / sign-in decision engine

pub mod identity;
pub mod invite;
pub mod linking;
pub mod user;

pub use identity::Identity;
pub use invite::Invite;
pub use linking::{determine_account_linking, AccountLinkingDecision, AccountLinkingResult};
pub use user::User;
