// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana wallet sign-in provider.
//!
//! Turns a `grant_type=web3` credential triple (chain, message, signature)
//! into an identity assertion. Cheap shape checks run before the message is
//! parsed; signature problems always surface as the generic mismatch
//! rejection so probing clients learn nothing about which step failed.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::{codes, ApiError};
use crate::siws::{self, SiwsError, MAX_MESSAGE_LENGTH, MIN_MESSAGE_LENGTH};

use super::{Chain, Claims, UserProvidedData};

/// Provider name recorded on identities created through this flow.
pub const PROVIDER_NAME: &str = "solana";

/// Issuer recorded in the assertion metadata.
pub const ISSUER: &str = "web3/solana";

/// Request body of the `grant_type=web3` token grant.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Web3GrantParams {
    /// Chain the wallet lives on; only `solana` is supported.
    pub chain: String,
    /// The raw signed sign-in message.
    pub message: String,
    /// Base64-encoded 64-byte ed25519 signature over `message`.
    pub signature: String,
}

fn invalid_grant(err: SiwsError) -> ApiError {
    ApiError::oauth_error("invalid_grant", err.to_string())
}

/// Verify a wallet sign-in credential and emit the identity assertion.
///
/// Pure function of the credential, server policy, and `now`; storage is
/// never touched.
pub fn verify_grant(
    config: &Config,
    params: &Web3GrantParams,
    now: DateTime<Utc>,
) -> Result<UserProvidedData, ApiError> {
    if !config.web3_solana_enabled {
        return Err(ApiError::bad_request(
            codes::WEB3_PROVIDER_DISABLED,
            "Web3 provider is disabled",
        ));
    }
    let chain = Chain::parse(&params.chain)
        .ok_or_else(|| ApiError::bad_request(codes::WEB3_UNSUPPORTED_CHAIN, "Unsupported chain"))?;

    if params.message.len() < MIN_MESSAGE_LENGTH {
        return Err(ApiError::bad_request(
            codes::VALIDATION_FAILED,
            format!("Signed message must be at least {MIN_MESSAGE_LENGTH} characters"),
        ));
    }
    if params.message.len() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::bad_request(
            codes::VALIDATION_FAILED,
            format!("Signed message must not exceed {MAX_MESSAGE_LENGTH} characters"),
        ));
    }

    // Signature shape problems are indistinguishable from bad signatures.
    let decoded = Base64::decode_vec(&params.signature)
        .map_err(|_| invalid_grant(SiwsError::SignatureMismatch))?;
    let signature: [u8; 64] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| invalid_grant(SiwsError::SignatureMismatch))?;

    let message = siws::parse(&params.message).map_err(invalid_grant)?;
    siws::validate(
        &message,
        &params.message,
        &signature,
        &config.allowed_uris(),
        now,
    )
    .map_err(invalid_grant)?;

    let mut custom_claims = Map::new();
    custom_claims.insert("address".to_string(), Value::String(message.address.clone()));
    custom_claims.insert(
        "chain".to_string(),
        Value::String(chain.as_str().to_string()),
    );
    custom_claims.insert("domain".to_string(), Value::String(message.domain.clone()));
    if let Some(statement) = &message.statement {
        custom_claims.insert("statement".to_string(), Value::String(statement.clone()));
    }

    Ok(UserProvidedData {
        emails: Vec::new(),
        metadata: Some(Claims {
            issuer: ISSUER.to_string(),
            subject: message.address,
            custom_claims,
            ..Default::default()
        }),
    })
}
