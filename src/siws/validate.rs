// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Policy, temporal, and signature validation for parsed sign-in messages.

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, VerifyingKey};
use url::Url;

use super::message::SignInMessage;
use super::{SiwsError, ISSUED_AT_WINDOW_MINUTES};

/// Validate `message` against server policy and verify its signature.
///
/// Rules run in a fixed order and the first failure wins:
///
/// 1. the URI must use https, unless its host is `localhost`
/// 2. the URI must match one of `allowed_uris` (scheme + host + port)
/// 3. the `domain` line must equal the URI authority
/// 4. `not_before`, `expiration_time`, then the issuance window around `now`
/// 5. the ed25519 signature over the raw message bytes must verify against
///    the address in the message
///
/// `raw` must be the exact byte sequence the wallet signed; `message` must be
/// the result of parsing it.
pub fn validate(
    message: &SignInMessage,
    raw: &str,
    signature: &[u8; 64],
    allowed_uris: &[Url],
    now: DateTime<Utc>,
) -> Result<(), SiwsError> {
    check_uri_scheme(message)?;
    check_uri_allowed(message, allowed_uris)?;
    check_domain(message)?;
    check_temporal(message, now)?;
    verify_signature(message, raw, signature)
}

fn check_uri_scheme(message: &SignInMessage) -> Result<(), SiwsError> {
    let localhost = message.uri.host_str() == Some("localhost");
    if message.uri.scheme() != "https" && !localhost {
        return Err(SiwsError::UriNotHttps);
    }
    Ok(())
}

/// Origin equality: scheme, host, and effective port all match.
fn origins_match(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn check_uri_allowed(message: &SignInMessage, allowed_uris: &[Url]) -> Result<(), SiwsError> {
    if !allowed_uris
        .iter()
        .any(|candidate| origins_match(candidate, &message.uri))
    {
        return Err(SiwsError::UriNotAllowed);
    }
    Ok(())
}

fn check_domain(message: &SignInMessage) -> Result<(), SiwsError> {
    let mut authority = message.uri.host_str().unwrap_or_default().to_string();
    // port() is None when the URL carries the scheme's default port
    if let Some(port) = message.uri.port() {
        authority.push(':');
        authority.push_str(&port.to_string());
    }
    if message.domain != authority {
        return Err(SiwsError::DomainMismatch);
    }
    Ok(())
}

fn check_temporal(message: &SignInMessage, now: DateTime<Utc>) -> Result<(), SiwsError> {
    if let Some(not_before) = message.not_before {
        if now < not_before {
            return Err(SiwsError::NotYetValid);
        }
    }
    if let Some(expiration_time) = message.expiration_time {
        if now > expiration_time {
            return Err(SiwsError::Expired);
        }
    }

    // The issuance window applies independently of the explicit bounds above.
    let window = Duration::minutes(ISSUED_AT_WINDOW_MINUTES);
    if message.issued_at > now + window {
        return Err(SiwsError::IssuedTooFarInFuture);
    }
    if now > message.issued_at + window {
        return Err(SiwsError::IssuedTooLongAgo);
    }
    Ok(())
}

fn verify_signature(
    message: &SignInMessage,
    raw: &str,
    signature: &[u8; 64],
) -> Result<(), SiwsError> {
    let key = VerifyingKey::from_bytes(&message.address_bytes)
        .map_err(|_| SiwsError::SignatureMismatch)?;
    let signature = Signature::from_bytes(signature);
    key.verify_strict(raw.as_bytes(), &signature)
        .map_err(|_| SiwsError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siws::message::parse;
    use chrono::TimeZone;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn allowed() -> Vec<Url> {
        vec![
            Url::parse("https://linkly.id").unwrap(),
            Url::parse("http://localhost:5173").unwrap(),
        ]
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Build a signed message for a freshly generated wallet key.
    fn signed_message(domain: &str, uri: &str, fields: &str) -> (String, [u8; 64]) {
        let signing_key = SigningKey::generate(&mut OsRng);
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        let raw = format!(
            "{domain} wants you to sign in with your Solana account:\n{address}\n\nStatement\n\nURI: {uri}\nVersion: 1\n{fields}"
        );
        let signature = signing_key.sign(raw.as_bytes()).to_bytes();
        (raw, signature)
    }

    #[test]
    fn full_message_validates_inside_its_window() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z\nExpiration Time: 2025-03-29T00:10:00Z\nNot Before: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        let now = at("2025-03-29T00:09:59Z");
        assert_eq!(validate(&msg, &raw, &sig, &allowed(), now), Ok(()));
    }

    #[test]
    fn expired_wins_over_issuance_window_once_past_expiration() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z\nExpiration Time: 2025-03-29T00:10:00Z\nNot Before: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        let now = at("2025-03-29T00:10:01Z");
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), now),
            Err(SiwsError::Expired)
        );
    }

    #[test]
    fn minimal_message_relies_on_the_issuance_window() {
        let (raw, sig) = signed_message(
            "localhost:5173",
            "http://localhost:5173/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:09:59Z")),
            Ok(())
        );
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:10:01Z")),
            Err(SiwsError::IssuedTooLongAgo)
        );
    }

    #[test]
    fn http_uri_is_rejected_for_non_localhost() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "http://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:00:01Z")),
            Err(SiwsError::UriNotHttps)
        );
    }

    #[test]
    fn non_https_scheme_is_rejected_as_not_https() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "ftp://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:00:01Z")),
            Err(SiwsError::UriNotHttps)
        );
    }

    #[test]
    fn uri_for_another_app_is_rejected() {
        let (raw, sig) = signed_message(
            "evil.example",
            "https://evil.example/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:00:01Z")),
            Err(SiwsError::UriNotAllowed)
        );
    }

    #[test]
    fn domain_must_match_uri_authority() {
        let (raw, sig) = signed_message(
            "other.example",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:00:01Z")),
            Err(SiwsError::DomainMismatch)
        );
    }

    #[test]
    fn domain_with_port_matches_explicit_uri_port() {
        let (raw, sig) = signed_message(
            "localhost:5173",
            "http://localhost:5173/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:00:01Z")),
            Ok(())
        );
    }

    #[test]
    fn not_before_in_the_future_is_rejected() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z\nNot Before: 2025-03-29T00:05:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:04:59Z")),
            Err(SiwsError::NotYetValid)
        );
    }

    #[test]
    fn issued_too_far_in_the_future_is_rejected() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:20:01Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:10:00Z")),
            Err(SiwsError::IssuedTooFarInFuture)
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let (raw, sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let msg = parse(&raw).unwrap();
        // exactly ten minutes after issuance is still accepted
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:10:00Z")),
            Ok(())
        );
    }

    #[test]
    fn tampered_signature_is_a_signature_mismatch() {
        let (raw, mut sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        sig[7] ^= 0x55;
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T00:00:01Z")),
            Err(SiwsError::SignatureMismatch)
        );
    }

    #[test]
    fn signature_from_another_key_is_rejected() {
        let (raw, _sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            "Issued At: 2025-03-29T00:00:00Z",
        );
        let other = SigningKey::generate(&mut OsRng);
        let forged = other.sign(raw.as_bytes()).to_bytes();
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &forged, &allowed(), at("2025-03-29T00:00:01Z")),
            Err(SiwsError::SignatureMismatch)
        );
    }

    #[test]
    fn rule_order_reports_https_before_temporal_failures() {
        // expired AND non-https: the https rule fires first
        let (raw, sig) = signed_message(
            "evil.example",
            "http://evil.example/",
            "Issued At: 2025-03-29T00:00:00Z\nExpiration Time: 2025-03-29T00:01:00Z",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(
            validate(&msg, &raw, &sig, &allowed(), at("2025-03-29T09:00:00Z")),
            Err(SiwsError::UriNotHttps)
        );
    }

    #[test]
    fn timestamps_honor_utc_conversion() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 29, 0, 0, 0).unwrap();
        let (raw, sig) = signed_message(
            "linkly.id",
            "https://linkly.id/",
            // +01:00 offset, same instant as 00:00:00Z minus one hour
            "Issued At: 2025-03-29T01:00:00+01:00",
        );
        let msg = parse(&raw).unwrap();
        assert_eq!(msg.issued_at, issued);
        assert_eq!(validate(&msg, &raw, &sig, &allowed(), issued), Ok(()));
    }
}
