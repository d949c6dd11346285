// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version record HTTP handlers.
//!
//! Every route is served under `/api/versions` and mirrored under `/versions`.

use axum::{
	extract::{
		rejection::{JsonRejection, PathRejection, QueryRejection},
		Path, Query, State,
	},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use vertrack_server_db::{BranchFilter, VersionRecord, VersionStore};
use vertrack_server_notify::Notifier;

pub use vertrack_server_api::{
	CdnTriggerParams, CreateVersionRequest, LatestVersionParams, ListVersionsParams,
	ListVersionsResponse,
};

use crate::{api::AppState, error::ServerError, validation::validate_create_request};

#[utoipa::path(
    post,
    path = "/api/versions",
    request_body = CreateVersionRequest,
    responses(
        (status = 201, description = "Version recorded", body = VersionRecord),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    ),
    tag = "versions"
)]
/// POST /api/versions - Record a version reported by a build.
#[tracing::instrument(skip(state, payload))]
pub async fn create_version(
	State(state): State<AppState>,
	payload: Result<Json<CreateVersionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
	let new = validate_create_request(&req).map_err(|e| ServerError::BadRequest(e.to_string()))?;

	let record = state.store.insert(&new).await?;
	tracing::info!(version_id = record.id, target = %record.target, build_tag = %record.build_tag, "version recorded");

	if !state.notifier.notify(&record).await {
		tracing::debug!(version_id = record.id, "version notification not delivered");
	}

	Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/versions",
    params(ListVersionsParams),
    responses(
        (status = 200, description = "Page of versions ordered by id", body = ListVersionsResponse),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    ),
    tag = "versions"
)]
/// GET /api/versions - List versions.
#[tracing::instrument(skip(state, params))]
pub async fn list_versions(
	State(state): State<AppState>,
	params: Result<Query<ListVersionsParams>, QueryRejection>,
) -> Result<Json<ListVersionsResponse>, ServerError> {
	let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
	let skip = params.skip_clamped();
	let limit = params.limit_clamped();

	let (versions, total) = state.store.list_page(skip, limit).await?;

	Ok(Json(ListVersionsResponse {
		versions,
		total,
		skip,
		limit,
	}))
}

#[utoipa::path(
    get,
    path = "/api/versions/latest",
    params(LatestVersionParams),
    responses(
        (status = 200, description = "Most recently created matching version", body = VersionRecord),
        (status = 404, description = "No matching version", body = crate::error::ErrorResponse)
    ),
    tag = "versions"
)]
/// GET /api/versions/latest - Most recently created version.
#[tracing::instrument(skip(state, params))]
pub async fn get_latest_version(
	State(state): State<AppState>,
	params: Result<Query<LatestVersionParams>, QueryRejection>,
) -> Result<Json<VersionRecord>, ServerError> {
	let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;

	let record = if params.is_filtered() {
		let target = params
			.target
			.as_deref()
			.map(str::trim)
			.filter(|t| !t.is_empty());
		let branch = BranchFilter::parse(params.branch.as_deref());
		state.store.get_latest_by_filter(target, &branch).await?
	} else {
		state.store.get_latest().await?
	};

	record
		.map(Json)
		.ok_or_else(|| ServerError::NotFound("no versions found".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/versions/{id}",
    params(
        ("id" = i64, Path, description = "Version ID")
    ),
    responses(
        (status = 200, description = "Version found", body = VersionRecord),
        (status = 400, description = "Invalid ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Version not found", body = crate::error::ErrorResponse)
    ),
    tag = "versions"
)]
/// GET /api/versions/{id} - Fetch one version.
#[tracing::instrument(skip(state, id))]
pub async fn get_version(
	State(state): State<AppState>,
	id: Result<Path<i64>, PathRejection>,
) -> Result<Json<VersionRecord>, ServerError> {
	let Path(id) = id.map_err(|_| ServerError::BadRequest("version id must be an integer".to_string()))?;

	state
		.store
		.get_by_id(id)
		.await?
		.map(Json)
		.ok_or_else(|| ServerError::NotFound(format!("version {id} not found")))
}

#[utoipa::path(
    post,
    path = "/api/versions/cdn",
    params(CdnTriggerParams),
    responses(
        (status = 201, description = "Ingest queued; placeholder record returned", body = VersionRecord),
        (status = 400, description = "Unknown branch or invalid revision", body = crate::error::ErrorResponse),
        (status = 503, description = "Branch queue is full", body = crate::error::ErrorResponse)
    ),
    tag = "versions"
)]
/// POST /api/versions/cdn - Ingest a build from version control.
#[tracing::instrument(skip(state, params))]
pub async fn trigger_cdn_ingest(
	State(state): State<AppState>,
	params: Result<Query<CdnTriggerParams>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;

	let record = state
		.ingest
		.trigger(params.branch.trim(), params.revision.trim())
		.await?;

	Ok((StatusCode::CREATED, Json(record)))
}
