// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version record API types.

use serde::{Deserialize, Serialize};
#[cfg(feature = "openapi")]
use utoipa::{IntoParams, ToSchema};
use vertrack_server_db::VersionRecord;

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

fn default_limit() -> i64 {
	DEFAULT_LIST_LIMIT
}

/// Body for reporting a version directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateVersionRequest {
	/// Component the build belongs to, e.g. `server`.
	pub target: String,
	pub build_tag: String,
	/// Derived from `build_tag` when absent or blank.
	#[serde(default)]
	pub repo_root: Option<String>,
	#[serde(default)]
	pub git_branch: Option<String>,
	pub script_hash: String,
	pub db_hash: String,
}

/// Query parameters for listing versions.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(IntoParams), into_params(parameter_in = Query))]
pub struct ListVersionsParams {
	/// Rows to skip (default: 0).
	#[serde(default)]
	pub skip: i64,
	/// Maximum rows to return (default: 100, max: 1000).
	#[serde(default = "default_limit")]
	pub limit: i64,
}

impl ListVersionsParams {
	pub fn skip_clamped(&self) -> i64 {
		self.skip.max(0)
	}

	pub fn limit_clamped(&self) -> i64 {
		self.limit.clamp(0, MAX_LIST_LIMIT)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ListVersionsResponse {
	pub versions: Vec<VersionRecord>,
	pub total: i64,
	pub skip: i64,
	pub limit: i64,
}

/// Query parameters for the latest version.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(IntoParams), into_params(parameter_in = Query))]
pub struct LatestVersionParams {
	/// Only consider this target.
	pub target: Option<String>,
	/// Only consider this branch; a trailing `*` matches by prefix.
	pub branch: Option<String>,
}

impl LatestVersionParams {
	pub fn is_filtered(&self) -> bool {
		self.target.as_deref().is_some_and(|t| !t.trim().is_empty())
			|| self.branch.as_deref().is_some_and(|b| !b.trim().is_empty())
	}
}

/// Query parameters for triggering a build ingest.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(IntoParams), into_params(parameter_in = Query))]
pub struct CdnTriggerParams {
	/// Configured branch name.
	pub branch: String,
	/// Revision to stamp into the build tag.
	pub revision: String,
}
