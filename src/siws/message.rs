// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in message grammar.

use chrono::{DateTime, Utc};
use url::Url;

use super::SiwsError;

/// Required suffix of the first message line; everything before it is the
/// signing domain.
const HEADER_SUFFIX: &str = " wants you to sign in with your Solana account:";

/// A parsed sign-in message.
///
/// Parsing only establishes structure; policy and signature checks live in
/// [`validate`](super::validate).
#[derive(Debug, Clone, PartialEq)]
pub struct SignInMessage {
    /// Authority the message claims to be signed for (`host` or `host:port`).
    pub domain: String,
    /// Base58-encoded signer address, exactly as it appeared in the message.
    pub address: String,
    /// Decoded 32-byte ed25519 public key behind `address`.
    pub(crate) address_bytes: [u8; 32],
    /// Optional human-readable statement line.
    pub statement: Option<String>,
    /// Target URI the client signed for.
    pub uri: Url,
    /// Message format version.
    pub version: String,
    /// Optional chain identifier, e.g. `mainnet`.
    pub chain_id: Option<String>,
    /// Optional replay nonce.
    pub nonce: Option<String>,
    /// When the wallet produced the message.
    pub issued_at: DateTime<Utc>,
    /// Hard upper bound on validity, if the wallet set one.
    pub expiration_time: Option<DateTime<Utc>>,
    /// Earliest acceptance time, if the wallet set one.
    pub not_before: Option<DateTime<Utc>>,
}

struct FieldSpec {
    label: &'static str,
    name: &'static str,
    required: bool,
}

const FIELD_COUNT: usize = 7;

/// Labeled fields in canonical order. A line that matches none of the labels
/// still open at its position is malformed, which also rejects duplicates and
/// out-of-order fields.
const FIELDS: [FieldSpec; FIELD_COUNT] = [
    FieldSpec { label: "URI: ", name: "URI", required: true },
    FieldSpec { label: "Version: ", name: "Version", required: true },
    FieldSpec { label: "Chain ID: ", name: "Chain ID", required: false },
    FieldSpec { label: "Nonce: ", name: "Nonce", required: false },
    FieldSpec { label: "Issued At: ", name: "Issued At", required: true },
    FieldSpec { label: "Expiration Time: ", name: "Expiration Time", required: false },
    FieldSpec { label: "Not Before: ", name: "Not Before", required: false },
];

fn malformed(reason: impl Into<String>) -> SiwsError {
    SiwsError::Malformed(reason.into())
}

fn parse_timestamp(value: &str, name: &str) -> Result<DateTime<Utc>, SiwsError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| malformed(format!("`{name}` is not a valid RFC 3339 timestamp")))
}

/// Parse a raw sign-in message.
///
/// The grammar is positional: header line, address line, a blank line, an
/// optional statement block, then the labeled fields in canonical order.
pub fn parse(raw: &str) -> Result<SignInMessage, SiwsError> {
    let lines: Vec<&str> = raw.split('\n').collect();

    // split always yields at least one element
    let header = lines.first().copied().unwrap_or_default();
    let domain = header
        .strip_suffix(HEADER_SUFFIX)
        .ok_or_else(|| malformed("first line must name the signing domain"))?;
    if domain.is_empty() {
        return Err(malformed("signing domain must not be empty"));
    }

    let address_line = lines
        .get(1)
        .copied()
        .ok_or_else(|| malformed("missing address line"))?;
    let decoded = bs58::decode(address_line)
        .into_vec()
        .map_err(|_| malformed("address is not valid base58"))?;
    let address_bytes: [u8; 32] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| malformed("address must decode to a 32-byte public key"))?;

    match lines.get(2) {
        Some(&"") => {}
        _ => return Err(malformed("address must be followed by a blank line")),
    }

    let (statement, fields_start) = match lines.get(3) {
        None => return Err(malformed("missing message fields")),
        Some(line) if line.starts_with(FIELDS[0].label) => (None, 3),
        Some(&"") => return Err(malformed("unexpected blank line before message fields")),
        Some(line) => {
            match lines.get(4) {
                Some(&"") => {}
                _ => return Err(malformed("statement must be followed by a blank line")),
            }
            (Some((*line).to_string()), 5)
        }
    };

    let mut values: [Option<&str>; FIELD_COUNT] = [None; FIELD_COUNT];
    let mut next = 0usize;
    for line in &lines[fields_start..] {
        let mut matched = false;
        while next < FIELDS.len() {
            let field = &FIELDS[next];
            if let Some(value) = line.strip_prefix(field.label) {
                values[next] = Some(value);
                next += 1;
                matched = true;
                break;
            }
            if field.required {
                return Err(malformed(format!("expected a `{}` field", field.name)));
            }
            next += 1;
        }
        if !matched {
            return Err(malformed("unrecognized or out-of-order line in message fields"));
        }
    }
    for (idx, field) in FIELDS.iter().enumerate() {
        if field.required && values[idx].is_none() {
            return Err(malformed(format!("missing `{}` field", field.name)));
        }
    }

    let uri_value = values[0].ok_or_else(|| malformed("missing `URI` field"))?;
    let uri = Url::parse(uri_value).map_err(|_| malformed("`URI` is not a valid URL"))?;

    let version = values[1].ok_or_else(|| malformed("missing `Version` field"))?;
    if version.is_empty() {
        return Err(malformed("`Version` must not be empty"));
    }

    let issued_at_value = values[4].ok_or_else(|| malformed("missing `Issued At` field"))?;
    let issued_at = parse_timestamp(issued_at_value, "Issued At")?;
    let expiration_time = values[5]
        .map(|v| parse_timestamp(v, "Expiration Time"))
        .transpose()?;
    let not_before = values[6].map(|v| parse_timestamp(v, "Not Before")).transpose()?;

    Ok(SignInMessage {
        domain: domain.to_string(),
        address: address_line.to_string(),
        address_bytes,
        statement,
        uri,
        version: version.to_string(),
        chain_id: values[2].map(str::to_string),
        nonce: values[3].map(str::to_string),
        issued_at,
        expiration_time,
        not_before,
    })
}
