// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution for externally verified sign-ins.
//!
//! Two entry points, both driven by a verified provider assertion:
//!
//! - [`trigger_before_user_created`] runs pre-transaction. It peeks at the
//!   linking decision and, only when a fresh account would be created, gives
//!   the operator hook a chance to veto or decorate the signup.
//! - [`create_account_from_external_identity`] is the commit path. It runs
//!   inside the caller's transaction, re-derives the decision on that
//!   snapshot, and persists the outcome.
//!
//! The split exists because the hook manages its own transaction: invoking
//! it while the commit transaction is open would nest write transactions.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{codes, ApiError};
use crate::hooks::{
    check_tx, BeforeUserCreatedRequest, BeforeUserCreatedResponse, HookManager,
    BEFORE_USER_CREATED,
};
use crate::models::{
    determine_account_linking, AccountLinkingDecision, AccountLinkingResult, Identity, User,
};
use crate::provider::UserProvidedData;
use crate::storage::{Connection, StoreTx};

/// Signup parameters distilled from a provider assertion.
pub struct SignupParams {
    pub provider: String,
    pub email: Option<String>,
    pub aud: String,
    pub data: Map<String, Value>,
}

impl SignupParams {
    /// Build the provisional user this signup would persist.
    pub fn to_user_model(&self, is_sso_user: bool) -> User {
        let mut user = User::new(&self.aud, self.email.clone(), self.data.clone());
        user.is_sso_user = is_sso_user;
        user
    }
}

fn signup_params(
    data: &UserProvidedData,
    linking: &AccountLinkingResult,
    provider: &str,
    aud: &str,
) -> SignupParams {
    SignupParams {
        provider: provider.to_string(),
        email: linking.candidate_email.as_ref().map(|e| e.address.clone()),
        aud: aud.to_string(),
        data: claims_data(data),
    }
}

fn provider_subject(data: &UserProvidedData) -> Result<&str, ApiError> {
    match data.metadata.as_ref().map(|m| m.subject.as_str()) {
        Some(subject) if !subject.is_empty() => Ok(subject),
        _ => Err(ApiError::internal(
            "identity assertion is missing the provider subject",
        )),
    }
}

fn claims_data(data: &UserProvidedData) -> Map<String, Value> {
    data.metadata
        .as_ref()
        .map(|m| m.to_identity_data())
        .unwrap_or_default()
}

fn signup_disabled() -> ApiError {
    ApiError::unprocessable(codes::SIGNUP_DISABLED, "Signups not allowed for this instance")
}

fn invite_not_found() -> ApiError {
    ApiError::not_found(codes::INVITE_NOT_FOUND, "Invite not found")
}

/// Consult the before-user-created hook for a sign-in that would create an
/// account.
///
/// Must be called before the commit transaction opens; the hook dispatch
/// owns its own transaction. Returns the hook's decoration when it ran, or
/// `None` when it was disabled or the sign-in resolves to an existing
/// account.
pub fn trigger_before_user_created(
    conn: &Connection,
    config: &Config,
    hooks: &HookManager,
    data: &UserProvidedData,
    provider: &str,
    aud: &str,
) -> Result<Option<BeforeUserCreatedResponse>, ApiError> {
    if !hooks.enabled(BEFORE_USER_CREATED) {
        return Ok(None);
    }
    check_tx(conn)?;

    let subject = provider_subject(data)?.to_string();
    // Peek at the decision; the commit path re-derives it on its own
    // snapshot, so a stale answer here only costs one extra hook call.
    let linking = conn.transaction(
        |tx| -> Result<AccountLinkingResult, ApiError> {
            Ok(determine_account_linking(
                tx,
                &config.linking,
                &data.emails,
                aud,
                provider,
                &subject,
            )?)
        },
    )?;
    if linking.decision != AccountLinkingDecision::CreateAccount {
        return Ok(None);
    }
    if config.disable_signup {
        return Err(signup_disabled());
    }

    let user = signup_params(data, &linking, provider, aud).to_user_model(linking.is_sso());
    let response = hooks.before_user_created(conn, None, &BeforeUserCreatedRequest::new(user))?;
    Ok(Some(response))
}

/// Resolve a verified provider assertion into a persisted user.
///
/// Runs inside the caller's open transaction. Identity-key collisions from
/// racing sign-ins surface as a retryable conflict through the storage
/// error conversion.
pub fn create_account_from_external_identity(
    tx: &mut StoreTx,
    config: &Config,
    data: &UserProvidedData,
    provider: &str,
    aud: &str,
    invite_token: Option<&str>,
    overrides: Option<&BeforeUserCreatedResponse>,
) -> Result<User, ApiError> {
    let subject = provider_subject(data)?.to_string();
    let now = Utc::now();
    let linking =
        determine_account_linking(tx, &config.linking, &data.emails, aud, provider, &subject)?;

    match linking.decision {
        AccountLinkingDecision::AccountExists => {
            let (Some(mut user), Some(mut identity)) = (linking.user, linking.identity) else {
                return Err(ApiError::internal("linking decision lost its matched rows"));
            };
            let claims = claims_data(data);
            user.merge_user_metadata(&claims, now);
            identity.update_claims(claims, now);
            tx.update_identity(&identity)?;
            user.touch_sign_in(now);
            tx.update_user(&user)?;
            Ok(user)
        }
        AccountLinkingDecision::LinkAccount => {
            let Some(mut user) = linking.user else {
                return Err(ApiError::internal("linking decision lost its matched user"));
            };
            tx.create_identity(&Identity::new(user.id, provider, &subject, claims_data(data)))?;

            user.add_provider(provider, now);
            if let Some(email) = &linking.candidate_email {
                if user.email.as_deref() == Some(email.address.as_str()) {
                    user.confirm_email(now);
                }
            }
            user.touch_sign_in(now);
            tx.update_user(&user)?;
            Ok(user)
        }
        AccountLinkingDecision::CreateAccount => {
            if config.disable_signup {
                return Err(signup_disabled());
            }
            if linking.candidate_email.is_none() && !data.emails.is_empty() {
                return Err(ApiError::unprocessable(
                    codes::PROVIDER_EMAIL_NEEDS_VERIFICATION,
                    format!(
                        "Unverified email with {provider}. Verify the email with {provider} and try again"
                    ),
                ));
            }

            let invite = match invite_token {
                Some(token) => {
                    let Some(invite) = tx.find_invite(token)? else {
                        return Err(invite_not_found());
                    };
                    let email_matches = linking
                        .candidate_email
                        .as_ref()
                        .is_some_and(|e| invite.matches_email(&e.address));
                    if invite.is_accepted() || invite.aud != aud || !email_matches {
                        return Err(invite_not_found());
                    }
                    Some(invite)
                }
                None => None,
            };

            let mut user =
                signup_params(data, &linking, provider, aud).to_user_model(linking.is_sso());
            if let Some(overrides) = overrides {
                if let Some(meta) = &overrides.user_metadata {
                    user.merge_user_metadata(meta, now);
                }
                if let Some(meta) = &overrides.app_metadata {
                    user.merge_app_metadata(meta, now);
                }
            }
            if let Some(email) = &linking.candidate_email {
                if email.verified {
                    user.confirm_email(now);
                }
            }
            if let Some(invite) = &invite {
                user.invited_at = Some(invite.created_at);
            }
            user.add_provider(provider, now);
            user.touch_sign_in(now);

            tx.create_user(&user)?;
            tx.create_identity(&Identity::new(user.id, provider, &subject, claims_data(data)))?;
            if let Some(mut invite) = invite {
                invite.accept(user.id, now);
                tx.update_invite(&invite)?;
            }
            Ok(user)
        }
    }
}
