// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::{
	routing::{get, post},
	Router,
};
use sqlx::SqlitePool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use vertrack_server_config::ServerConfig;
use vertrack_server_db::{VersionRepository, VersionStore};
use vertrack_server_ingest::{
	BranchTable, CommandExporter, IngestPipeline, IngestService, IngestSettings, SvnCommandClient,
};
use vertrack_server_notify::{NoopNotifier, Notifier, WebhookNotifier};

use crate::{error::ServerError, routes};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub store: Arc<dyn VersionStore>,
	pub notifier: Arc<dyn Notifier>,
	pub ingest: Arc<IngestService>,
}

/// Wire the store, notifier and ingest pipeline from configuration.
///
/// Starts the ingest workers, so it must run inside the tokio runtime.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let store: Arc<dyn VersionStore> = Arc::new(VersionRepository::new(pool.clone()));

	let notifier: Arc<dyn Notifier> = if config.notify.is_configured() {
		let webhook = WebhookNotifier::new(
			config.notify.webhook_url.clone(),
			Duration::from_secs(config.notify.timeout_secs),
		)
		.map_err(|e| ServerError::Internal(format!("failed to build webhook client: {e}")))?;
		Arc::new(webhook)
	} else {
		tracing::info!("no webhook configured, notifications disabled");
		Arc::new(NoopNotifier)
	};

	let settings = IngestSettings::from_config(&config.ingest)
		.map_err(|e| ServerError::Internal(format!("failed to resolve ingest paths: {e}")))?;
	let exporter = CommandExporter::new(
		settings.exporter_file_name(),
		config.ingest.exporter_args.clone(),
		Duration::from_secs(config.ingest.exporter_timeout_secs),
	);
	let pipeline = Arc::new(IngestPipeline::new(
		settings,
		store.clone(),
		Arc::new(SvnCommandClient::from_config(&config.vcs)),
		Arc::new(exporter),
		notifier.clone(),
	));

	let branches = BranchTable::new(config.ingest.branches.clone());
	if branches.is_empty() {
		tracing::warn!("no ingest branches configured, build ingest is disabled");
	}
	let ingest = Arc::new(IngestService::start(
		branches,
		config.ingest.queue_capacity,
		pipeline,
	));

	Ok(AppState {
		pool,
		store,
		notifier,
		ingest,
	})
}

fn version_routes(router: Router<AppState>, prefix: &str) -> Router<AppState> {
	router
		.route(
			prefix,
			post(routes::versions::create_version).get(routes::versions::list_versions),
		)
		.route(
			&format!("{prefix}/latest"),
			get(routes::versions::get_latest_version),
		)
		.route(
			&format!("{prefix}/cdn"),
			post(routes::versions::trigger_cdn_ingest),
		)
		.route(&format!("{prefix}/{{id}}"), get(routes::versions::get_version))
}

pub fn create_router(state: AppState) -> Router {
	let mut router = Router::new()
		.route("/", get(routes::health::root))
		.route("/health", get(routes::health::health_check));
	router = version_routes(router, "/api/versions");
	router = version_routes(router, "/versions");

	router
		.with_state(state)
		.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", crate::api_docs::ApiDoc::openapi()))
}
