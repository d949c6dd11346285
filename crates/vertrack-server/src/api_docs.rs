// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpenAPI document for the HTTP surface.

use utoipa::OpenApi;

use crate::routes;

#[derive(OpenApi)]
#[openapi(
	info(
		title = "vertrack",
		description = "Build version tracking service"
	),
	paths(
		routes::health::root,
		routes::health::health_check,
		routes::versions::create_version,
		routes::versions::list_versions,
		routes::versions::get_latest_version,
		routes::versions::get_version,
		routes::versions::trigger_cdn_ingest,
	),
	components(schemas(
		vertrack_server_api::CreateVersionRequest,
		vertrack_server_api::ListVersionsResponse,
		vertrack_server_api::ErrorResponse,
		vertrack_server_api::RootResponse,
		vertrack_server_api::HealthResponse,
		vertrack_server_db::VersionRecord,
	)),
	tags(
		(name = "versions", description = "Build version records"),
		(name = "health", description = "Service health")
	)
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_openapi_lists_version_paths() {
		let doc = ApiDoc::openapi();
		for path in [
			"/",
			"/health",
			"/api/versions",
			"/api/versions/latest",
			"/api/versions/{id}",
			"/api/versions/cdn",
		] {
			assert!(doc.paths.paths.contains_key(path), "missing {path}");
		}
	}
}
