// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service banner and health HTTP handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use vertrack_server_api::{HealthComponents, HealthResponse, RootResponse};
use vertrack_server_ingest::HealthState;

use crate::{api::AppState, health, version};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootResponse)
    ),
    tag = "health"
)]
/// GET / - Service banner with links to docs and health.
pub async fn root() -> Json<RootResponse> {
	Json(RootResponse {
		message: "vertrack build version tracker".to_string(),
		docs: "/docs".to_string(),
		health: "/health".to_string(),
	})
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System is healthy or degraded", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "health"
)]
/// GET /health - Database and ingest health.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let overall_start = tokio::time::Instant::now();

	let (database, ingest) = tokio::join!(
		health::check_database(&state.pool),
		health::check_ingest(&state.ingest)
	);

	let components = HealthComponents { database, ingest };
	let status = health::aggregate_status(&components);

	let response = HealthResponse {
		status,
		service: version::SERVICE_NAME.to_string(),
		version: version::VERSION.to_string(),
		timestamp: chrono::Utc::now(),
		duration_ms: overall_start.elapsed().as_millis() as u64,
		components,
	};

	let http_status = match status {
		HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
		HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}
