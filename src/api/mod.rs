// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{Identity, User},
    provider::solana::Web3GrantParams,
    state::AppState,
    tokens::AccessTokenResponse,
};

pub mod external;
pub mod health;
pub mod token;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/token", post(token::token))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        token::token,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            User,
            Identity,
            Web3GrantParams,
            AccessTokenResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Token", description = "Session issuance for externally verified identities"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
