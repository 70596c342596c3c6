// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sign In With Solana
//!
//! Parser and validator for the fixed-grammar sign-in message Solana wallets
//! produce:
//!
//! ```text
//! <domain> wants you to sign in with your Solana account:
//! <base58 address>
//!
//! <optional statement>
//!
//! URI: <uri>
//! Version: <version>
//! Chain ID: <optional>
//! Nonce: <optional>
//! Issued At: <RFC 3339>
//! Expiration Time: <optional RFC 3339>
//! Not Before: <optional RFC 3339>
//! ```
//!
//! Validation runs a fixed rule order and reports the first failing rule:
//! https requirement, URI allow-list, domain/authority match, temporal rules,
//! then the ed25519 signature over the raw message bytes. Error messages are
//! part of the wire contract; clients match on them.

pub mod message;
pub mod validate;

pub use message::{parse, SignInMessage};
pub use validate::validate;

/// Messages shorter than this cannot contain the required grammar.
pub const MIN_MESSAGE_LENGTH: usize = 64;

/// Upper bound on accepted messages, keeps parsing work bounded.
pub const MAX_MESSAGE_LENGTH: usize = 20 * 1024;

/// Accepted issuance window around the server clock.
pub const ISSUED_AT_WINDOW_MINUTES: i64 = 10;

/// Why a sign-in message was rejected.
///
/// The `Display` strings are returned verbatim as `error_description` in the
/// OAuth-style rejection, so they are stable.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SiwsError {
    #[error("Malformed Solana sign-in message: {0}")]
    Malformed(String),

    #[error("Signed Solana message is using URI which does not use HTTPS")]
    UriNotHttps,

    #[error("Signed Solana message is using URI which is not allowed on this server, message was signed for another app")]
    UriNotAllowed,

    #[error("Signed Solana message is using a Domain that does not match the one in URI which is not allowed on this server")]
    DomainMismatch,

    #[error("Signed Solana message becomes valid in the future")]
    NotYetValid,

    #[error("Signed Solana message is expired")]
    Expired,

    #[error("Solana message was issued too far in the future")]
    IssuedTooFarInFuture,

    #[error("Solana message was issued too long ago")]
    IssuedTooLongAgo,

    #[error("Signature does not match address in message")]
    SignatureMismatch,
}
