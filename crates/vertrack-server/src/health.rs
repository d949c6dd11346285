// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health checks for the components the server depends on.

use sqlx::SqlitePool;
use tokio::time::Instant;
use vertrack_server_api::{DatabaseHealth, HealthComponents};
use vertrack_server_ingest::{HealthState, IngestHealth, IngestService};

pub async fn check_database(pool: &SqlitePool) -> DatabaseHealth {
	let start = Instant::now();
	let result = vertrack_server_db::ping(pool).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(()) => DatabaseHealth {
			status: HealthState::Healthy,
			latency_ms,
			error: None,
		},
		Err(e) => {
			tracing::warn!(error = %e, "database health check failed");
			DatabaseHealth {
				status: HealthState::Unhealthy,
				latency_ms,
				error: Some(e.to_string()),
			}
		}
	}
}

pub async fn check_ingest(ingest: &IngestService) -> IngestHealth {
	ingest.health().await
}

/// Worst state across components.
pub fn aggregate_status(components: &HealthComponents) -> HealthState {
	let states = [components.database.status, components.ingest.status];
	if states.contains(&HealthState::Unhealthy) {
		HealthState::Unhealthy
	} else if states.contains(&HealthState::Degraded) {
		HealthState::Degraded
	} else {
		HealthState::Healthy
	}
}
