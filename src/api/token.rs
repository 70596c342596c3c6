// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::provider::solana::{self, Web3GrantParams};
use crate::state::AppState;
use crate::tokens::AccessTokenResponse;

use super::external;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TokenGrantQuery {
    /// Grant flow to run; only `web3` is supported.
    #[serde(default)]
    pub grant_type: String,
}

/// OAuth-style token endpoint.
#[utoipa::path(
    post,
    path = "/token",
    params(TokenGrantQuery),
    request_body = Web3GrantParams,
    tag = "Token",
    responses(
        (status = 200, description = "Session issued", body = AccessTokenResponse),
        (status = 400, description = "Invalid or unsupported grant"),
        (status = 422, description = "Rejected by signup policy"),
        (status = 409, description = "Write conflict, retry the request")
    )
)]
pub async fn token(
    State(state): State<AppState>,
    Query(query): Query<TokenGrantQuery>,
    Json(params): Json<Web3GrantParams>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    match query.grant_type.as_str() {
        "web3" => web3_grant(state, params).await,
        _ => Err(ApiError::oauth_error(
            "unsupported_grant_type",
            "unsupported grant type",
        )),
    }
}

async fn web3_grant(
    state: AppState,
    params: Web3GrantParams,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let data = solana::verify_grant(&state.config, &params, Utc::now())?;

    // Hook dispatch manages its own transaction, so it must finish before
    // the commit transaction opens.
    let conn = state.store.connection();
    let overrides = external::trigger_before_user_created(
        &conn,
        &state.config,
        &state.hooks,
        &data,
        solana::PROVIDER_NAME,
        &state.config.jwt_aud,
    )?;

    let user = conn.transaction(|tx| {
        external::create_account_from_external_identity(
            tx,
            &state.config,
            &data,
            solana::PROVIDER_NAME,
            &state.config.jwt_aud,
            None,
            overrides.as_ref(),
        )
    })?;

    tracing::info!(user_id = %user.id, provider = solana::PROVIDER_NAME, "wallet sign-in");
    Ok(Json(state.issuer.issue(&user)))
}
