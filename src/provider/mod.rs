// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Providers
//!
//! Every verification method (wallet signature, OAuth, OTP) normalizes its
//! result into one [`UserProvidedData`] assertion: candidate emails plus
//! profile metadata keyed by issuer and subject. The linking engine and the
//! identity-resolution controller consume only this contract and never see
//! concrete provider types.

pub mod solana;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chains the wallet sign-in provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Solana,
}

impl Chain {
    pub fn parse(value: &str) -> Option<Chain> {
        match value {
            "solana" => Some(Chain::Solana),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Solana => "solana",
        }
    }
}

/// One candidate email carried by an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// The address as the provider reported it.
    pub address: String,
    /// Whether the provider attests the address as verified.
    pub verified: bool,
    /// Whether the provider marks this as the account's primary address.
    pub primary: bool,
}

/// Well-known profile claims plus an explicit side-channel for everything
/// else. Fields are populated by name; nothing is extracted dynamically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer of the claim set, e.g. `web3/solana` or an OAuth issuer URL.
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Stable subject identifier within the issuer.
    #[serde(rename = "sub")]
    pub subject: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Email as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the provider attests `email` as verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Provider-side username or handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Remaining provider claims that have no named field.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_claims: Map<String, Value>,
}

impl Claims {
    /// Flatten the claims into the JSON document stored on an identity.
    ///
    /// Known fields are inserted one by one under their wire names; the
    /// custom claims ride along under `custom_claims` when non-empty.
    pub fn to_identity_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("iss".to_string(), Value::String(self.issuer.clone()));
        data.insert("sub".to_string(), Value::String(self.subject.clone()));
        if let Some(name) = &self.name {
            data.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(picture) = &self.picture {
            data.insert("picture".to_string(), Value::String(picture.clone()));
        }
        if let Some(email) = &self.email {
            data.insert("email".to_string(), Value::String(email.clone()));
        }
        if let Some(email_verified) = self.email_verified {
            data.insert("email_verified".to_string(), Value::Bool(email_verified));
        }
        if let Some(preferred_username) = &self.preferred_username {
            data.insert(
                "preferred_username".to_string(),
                Value::String(preferred_username.clone()),
            );
        }
        if !self.custom_claims.is_empty() {
            data.insert(
                "custom_claims".to_string(),
                Value::Object(self.custom_claims.clone()),
            );
        }
        data
    }
}

/// Normalized output of any verification method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProvidedData {
    /// Candidate emails, possibly empty (wallet identities usually carry
    /// none).
    pub emails: Vec<Email>,
    /// Profile metadata; `issuer` + `subject` form the external identity key.
    pub metadata: Option<Claims>,
}

impl UserProvidedData {
    /// The provider-designated primary email, if any.
    pub fn primary_email(&self) -> Option<&Email> {
        self.emails.iter().find(|email| email.primary)
    }
}
