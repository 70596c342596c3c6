// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account linking decision engine.
//!
//! Given a verified identity assertion, decides whether the `(provider,
//! provider_id)` pair signs in an existing account, links onto an account
//! matched by verified email, or creates a fresh account. The engine runs
//! inside the caller's open transaction and never writes; business outcomes
//! are encoded in the decision, only storage failures come back as errors.
//!
//! Email matching is scoped to a linking domain. Ordinary addresses live in
//! the `default` domain; addresses whose domain an operator has registered
//! for SSO get their own `sso:<domain>` namespace and never link onto
//! default-domain accounts (nor the other way around).

use unicode_normalization::UnicodeNormalization;

use crate::config::LinkingPolicy;
use crate::provider::Email;
use crate::storage::{StoreResult, StoreTx};

use super::identity::Identity;
use super::user::User;

/// Linking domain for addresses not claimed by any SSO configuration.
pub const DEFAULT_LINKING_DOMAIN: &str = "default";

const SSO_DOMAIN_PREFIX: &str = "sso:";

/// Outcome of [`determine_account_linking`]; exactly one per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLinkingDecision {
    /// The identity is already bound to a user in this audience.
    AccountExists,
    /// Exactly one user in the audience holds a matching verified email.
    LinkAccount,
    /// No usable match; a new account should be provisioned.
    CreateAccount,
}

/// Everything the caller needs to act on a linking decision.
#[derive(Debug, Clone)]
pub struct AccountLinkingResult {
    pub decision: AccountLinkingDecision,
    /// Matched user for `AccountExists` and `LinkAccount`.
    pub user: Option<User>,
    /// Matched identity for `AccountExists`.
    pub identity: Option<Identity>,
    /// Email the new or linked account should carry, already normalized.
    pub candidate_email: Option<Email>,
    /// `default`, or `sso:<domain>` for operator-registered SSO domains.
    pub linking_domain: String,
}

impl AccountLinkingResult {
    /// Whether the decision landed in an SSO linking domain.
    pub fn is_sso(&self) -> bool {
        self.linking_domain.starts_with(SSO_DOMAIN_PREFIX)
    }
}

/// Decide how a verified `(provider, provider_id)` assertion maps onto the
/// accounts in `aud`.
///
/// Runs entirely inside `tx`; opening a nested transaction here would
/// deadlock the single-writer store.
pub fn determine_account_linking(
    tx: &StoreTx,
    policy: &LinkingPolicy,
    emails: &[Email],
    aud: &str,
    provider: &str,
    provider_id: &str,
) -> StoreResult<AccountLinkingResult> {
    let emails = normalize_emails(emails);
    let candidate = select_candidate(&emails, policy);
    let linking_domain = linking_domain_for(candidate.as_ref(), &policy.sso_domains);

    // An identity row wins outright, regardless of emails.
    if let Some(identity) = tx.find_identity(provider, provider_id)? {
        if let Some(user) = tx.find_user(identity.user_id)? {
            if user.aud == aud {
                return Ok(AccountLinkingResult {
                    decision: AccountLinkingDecision::AccountExists,
                    user: Some(user),
                    identity: Some(identity),
                    candidate_email: None,
                    linking_domain,
                });
            }
        }
        // Identity bound outside this audience: fall through. A later
        // CreateAccount insert will surface the key conflict as retryable.
    }

    // Email matches only link within the default domain; SSO-domain
    // addresses always provision their own account namespace.
    if policy.email_linking_enabled && linking_domain == DEFAULT_LINKING_DOMAIN {
        let verified: Vec<String> = emails
            .iter()
            .filter(|e| e.verified)
            .map(|e| e.address.clone())
            .collect();
        let matches = tx.find_users_with_verified_email(aud, &verified)?;
        if matches.len() == 1 {
            let user = matches.into_iter().next();
            let matched = emails
                .iter()
                .find(|e| {
                    e.verified
                        && user
                            .as_ref()
                            .and_then(|u| u.email.as_deref())
                            .is_some_and(|addr| addr == e.address)
                })
                .or_else(|| emails.iter().find(|e| e.verified))
                .cloned();
            return Ok(AccountLinkingResult {
                decision: AccountLinkingDecision::LinkAccount,
                user,
                identity: None,
                candidate_email: matched,
                linking_domain,
            });
        }
        // Zero matches and ambiguous multi-matches both provision fresh.
    }

    Ok(AccountLinkingResult {
        decision: AccountLinkingDecision::CreateAccount,
        user: None,
        identity: None,
        candidate_email: candidate,
        linking_domain,
    })
}

/// NFKC-fold and lower-case addresses so lookalike and mixed-case spellings
/// collapse to one canonical key.
fn normalize_emails(emails: &[Email]) -> Vec<Email> {
    emails
        .iter()
        .map(|e| Email {
            address: e.address.nfkc().collect::<String>().to_lowercase(),
            verified: e.verified,
            primary: e.primary,
        })
        .collect()
}

fn select_candidate(emails: &[Email], policy: &LinkingPolicy) -> Option<Email> {
    let pick = |verified: bool| {
        emails
            .iter()
            .find(|e| e.verified == verified && e.primary)
            .or_else(|| emails.iter().find(|e| e.verified == verified))
    };
    let candidate = pick(true).or_else(|| {
        if policy.allow_unverified_email_sign_ins {
            pick(false)
        } else {
            None
        }
    });
    candidate.cloned()
}

fn linking_domain_for(candidate: Option<&Email>, sso_domains: &[String]) -> String {
    let Some(domain) = candidate.and_then(|e| e.address.rsplit_once('@').map(|(_, d)| d)) else {
        return DEFAULT_LINKING_DOMAIN.to_string();
    };
    if sso_domains.iter().any(|d| d.eq_ignore_ascii_case(domain)) {
        format!("{SSO_DOMAIN_PREFIX}{domain}")
    } else {
        DEFAULT_LINKING_DOMAIN.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthStore;
    use chrono::Utc;
    use serde_json::Map;

    fn policy() -> LinkingPolicy {
        LinkingPolicy {
            email_linking_enabled: true,
            allow_unverified_email_sign_ins: false,
            sso_domains: vec!["corp.example".to_string()],
        }
    }

    fn verified(address: &str) -> Email {
        Email {
            address: address.to_string(),
            verified: true,
            primary: true,
        }
    }

    fn seed_confirmed_user(tx: &mut StoreTx, aud: &str, email: &str) -> User {
        let mut user = User::new(aud, Some(email.to_string()), Map::new());
        user.confirm_email(Utc::now());
        tx.create_user(&user).unwrap();
        user
    }

    #[test]
    fn unknown_identity_without_emails_creates_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::CreateAccount);
                assert!(result.user.is_none());
                assert!(result.candidate_email.is_none());
                assert_eq!(result.linking_domain, DEFAULT_LINKING_DOMAIN);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn bound_identity_signs_in_its_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                let user = User::new("authenticated", None, Map::new());
                tx.create_user(&user)?;
                let identity = Identity::new(user.id, "solana", "addr-1", Map::new());
                tx.create_identity(&identity)?;

                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::AccountExists);
                assert_eq!(result.user.unwrap().id, user.id);
                assert_eq!(result.identity.unwrap().id, identity.id);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn identity_in_other_audience_does_not_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                let user = User::new("admin", None, Map::new());
                tx.create_user(&user)?;
                tx.create_identity(&Identity::new(user.id, "solana", "addr-1", Map::new()))?;

                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::CreateAccount);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn single_verified_email_match_links() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                let user = seed_confirmed_user(tx, "authenticated", "one@linkly.id");

                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[verified("One@Linkly.ID")],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::LinkAccount);
                assert_eq!(result.user.unwrap().id, user.id);
                assert_eq!(result.candidate_email.unwrap().address, "one@linkly.id");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn fullwidth_spelling_collapses_to_the_same_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                let user = seed_confirmed_user(tx, "authenticated", "one@linkly.id");

                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[verified("one@ｌｉｎｋｌｙ.id")],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::LinkAccount);
                assert_eq!(result.user.unwrap().id, user.id);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn disabled_email_linking_always_creates() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                seed_confirmed_user(tx, "authenticated", "one@linkly.id");

                let mut policy = policy();
                policy.email_linking_enabled = false;
                let result = determine_account_linking(
                    tx,
                    &policy,
                    &[verified("one@linkly.id")],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::CreateAccount);
                assert_eq!(result.candidate_email.unwrap().address, "one@linkly.id");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn ambiguous_email_match_creates_instead_of_guessing() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                seed_confirmed_user(tx, "authenticated", "one@linkly.id");
                seed_confirmed_user(tx, "authenticated", "two@linkly.id");

                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[verified("one@linkly.id"), verified("two@linkly.id")],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::CreateAccount);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn unverified_email_needs_the_policy_escape_hatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                let emails = [Email {
                    address: "new@linkly.id".to_string(),
                    verified: false,
                    primary: true,
                }];

                let strict = determine_account_linking(
                    tx,
                    &policy(),
                    &emails,
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(strict.decision, AccountLinkingDecision::CreateAccount);
                assert!(strict.candidate_email.is_none());

                let mut lenient = policy();
                lenient.allow_unverified_email_sign_ins = true;
                let relaxed = determine_account_linking(
                    tx,
                    &lenient,
                    &emails,
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(relaxed.decision, AccountLinkingDecision::CreateAccount);
                assert_eq!(relaxed.candidate_email.unwrap().address, "new@linkly.id");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn sso_domain_email_never_links_onto_default_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.redb")).unwrap();
        store
            .connection()
            .transaction(|tx| -> crate::storage::StoreResult<()> {
                seed_confirmed_user(tx, "authenticated", "one@corp.example");

                let result = determine_account_linking(
                    tx,
                    &policy(),
                    &[verified("one@corp.example")],
                    "authenticated",
                    "solana",
                    "addr-1",
                )?;
                assert_eq!(result.decision, AccountLinkingDecision::CreateAccount);
                assert_eq!(result.linking_domain, "sso:corp.example");
                assert!(result.is_sso());
                Ok(())
            })
            .unwrap();
    }
}
