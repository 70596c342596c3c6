// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Aggregate health report with per-dependency detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" when every check passes, "degraded" otherwise.
    pub status: String,
    pub checks: HealthChecks,
}

/// One entry per dependency the service needs to answer requests.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Data directory availability.
    pub data_dir: String,
    /// Account store availability (redb read snapshot).
    pub store: String,
}

/// Minimal body for the liveness probe.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Check that the configured data directory exists.
fn check_data_dir(state: &AppState) -> String {
    if state.config.data_dir.exists() {
        "ok".to_string()
    } else {
        "missing".to_string()
    }
}

/// Check that the account store can serve a read snapshot.
fn check_store(state: &AppState) -> String {
    match state.store.probe() {
        Ok(()) => "ok".to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "store probe failed");
            "unavailable".to_string()
        }
    }
}

/// Full health check: 200 when every dependency answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let data_dir = check_data_dir(&state);
    let store = check_store(&state);

    let all_ok = data_dir == "ok" && store == "ok";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            data_dir,
            store,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe: answers 200 as long as the process can serve a request.
/// Dependency state is deliberately ignored; that is what readiness is for.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe for orchestrators; same checks as the full health report.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
