// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type shared by every handler.
//!
//! Two wire shapes exist, matching what OAuth clients expect from a token
//! endpoint versus what the rest of the API returns:
//!
//! - grant-flow failures render as `{"error", "error_description"}` with
//!   HTTP 400 (`invalid_grant`, `unsupported_grant_type`),
//! - everything else renders as `{"error_code", "msg"}` with the variant's
//!   status code.
//!
//! Internal failures are logged with full detail and answered with a generic
//! message so storage or hook internals never leak to clients.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Response header duplicating the error code for request-log correlation.
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// Stable error codes carried in the `error_code` field.
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const WEB3_UNSUPPORTED_CHAIN: &str = "web3_unsupported_chain";
    pub const WEB3_PROVIDER_DISABLED: &str = "web3_provider_disabled";
    pub const SIGNUP_DISABLED: &str = "signup_disabled";
    pub const PROVIDER_EMAIL_NEEDS_VERIFICATION: &str = "provider_email_needs_verification";
    pub const INVITE_NOT_FOUND: &str = "invite_not_found";
    pub const CONFLICT: &str = "conflict";
    pub const HOOK_TIMEOUT: &str = "hook_timeout";
    pub const UNEXPECTED_FAILURE: &str = "unexpected_failure";
}

/// Error returned by API handlers and the controllers beneath them.
#[derive(Debug)]
pub enum ApiError {
    /// OAuth-style grant failure, always HTTP 400.
    OAuth {
        error: &'static str,
        description: String,
    },
    /// Request rejected by validation, HTTP 400.
    BadRequest { code: &'static str, msg: String },
    /// Referenced resource does not exist, HTTP 404.
    NotFound { code: &'static str, msg: String },
    /// Request is well-formed but rejected by policy, HTTP 422.
    UnprocessableEntity { code: &'static str, msg: String },
    /// Write collided with a concurrent transaction, HTTP 409. Retryable.
    Conflict { msg: String },
    /// An operator hook rejected the request with an explicit status.
    Hook {
        status: StatusCode,
        code: Option<String>,
        msg: String,
    },
    /// Unexpected failure, HTTP 500. The message is logged, not returned.
    Internal { msg: String },
}

#[derive(Serialize)]
struct OAuthErrorBody {
    error: &'static str,
    error_description: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error_code: String,
    msg: String,
}

impl ApiError {
    pub fn oauth_error(error: &'static str, description: impl Into<String>) -> Self {
        ApiError::OAuth {
            error,
            description: description.into(),
        }
    }

    pub fn bad_request(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            msg: msg.into(),
        }
    }

    pub fn not_found(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            msg: msg.into(),
        }
    }

    pub fn unprocessable(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity {
            code,
            msg: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal { msg: msg.into() }
    }

    /// HTTP status this error renders with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::OAuth { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Hook { status, .. } => *status,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable code carried in the `error_code` field.
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::OAuth { error, .. } => error,
            ApiError::BadRequest { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::UnprocessableEntity { code, .. } => code,
            ApiError::Conflict { .. } => codes::CONFLICT,
            ApiError::Hook { code, .. } => code.as_deref().unwrap_or("hook_error"),
            ApiError::Internal { .. } => codes::UNEXPECTED_FAILURE,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::OAuth { description, .. } => write!(f, "{description}"),
            ApiError::BadRequest { msg, .. }
            | ApiError::NotFound { msg, .. }
            | ApiError::UnprocessableEntity { msg, .. }
            | ApiError::Conflict { msg }
            | ApiError::Hook { msg, .. }
            | ApiError::Internal { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();
        let mut response = match self {
            ApiError::OAuth { error, description } => (
                status,
                Json(OAuthErrorBody {
                    error,
                    error_description: description,
                }),
            )
                .into_response(),
            ApiError::Internal { msg } => {
                tracing::error!(error = %msg, "internal server error");
                let body = ErrorBody {
                    error_code: codes::UNEXPECTED_FAILURE.to_string(),
                    msg: "Internal server error".to_string(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body = ErrorBody {
                    error_code: other.error_code().to_string(),
                    msg: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        };
        // Hook codes are operator-supplied; skip the header if unprintable.
        if let Ok(value) = HeaderValue::from_str(&code) {
            response.headers_mut().insert(ERROR_CODE_HEADER, value);
        }
        response
    }
}

impl From<crate::storage::StoreError> for ApiError {
    fn from(err: crate::storage::StoreError) -> Self {
        match err {
            crate::storage::StoreError::AlreadyExists(_) => ApiError::Conflict {
                msg: "Database conflict, please retry the request".to_string(),
            },
            other => ApiError::internal(other.to_string()),
        }
    }
}
