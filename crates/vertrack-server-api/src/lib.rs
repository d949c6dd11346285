// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod error;
pub mod health;
pub mod versions;

pub use error::ErrorResponse;
pub use health::{DatabaseHealth, HealthComponents, HealthResponse, RootResponse};
pub use versions::{
	CdnTriggerParams, CreateVersionRequest, LatestVersionParams, ListVersionsParams,
	ListVersionsResponse, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use vertrack_server_db::VersionRecord;
