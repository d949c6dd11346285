// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Input validation for directly reported versions.

use vertrack_server_api::CreateVersionRequest;
use vertrack_server_db::{HashSentinel, NewVersion};

pub const MAX_TARGET_LEN: usize = 100;
pub const MAX_BUILD_TAG_LEN: usize = 100;
pub const MAX_REPO_ROOT_LEN: usize = 500;
pub const MAX_BRANCH_LEN: usize = 100;
pub const MAX_HASH_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("{field} must not be empty")]
	Empty { field: &'static str },

	#[error("{field} must be at most {max} characters")]
	TooLong { field: &'static str, max: usize },
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(ValidationError::Empty { field });
	}
	bounded(field, value, max)
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
	if value.chars().count() > max {
		return Err(ValidationError::TooLong { field, max });
	}
	Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

/// Source location implied by a build tag.
///
/// A leading date segment (6 to 8 digits followed by `_` or `-`) is skipped
/// and the text up to the next `_` is returned, e.g. `20240115_game_v1` ->
/// `game`. Returns `unknown` when nothing is left.
pub fn derive_repo_root(build_tag: &str) -> String {
	let tag = build_tag.trim();
	let digits = tag.bytes().take_while(u8::is_ascii_digit).count();
	let rest = match tag.as_bytes().get(digits) {
		Some(b'_') | Some(b'-') if (6..=8).contains(&digits) => &tag[digits + 1..],
		_ => tag,
	};
	let root = rest.split('_').next().unwrap_or_default();
	if root.is_empty() {
		HashSentinel::Unknown.as_str().to_string()
	} else {
		root.to_string()
	}
}

/// Trim and check a create request, filling in `repo_root` when absent.
pub fn validate_create_request(req: &CreateVersionRequest) -> Result<NewVersion, ValidationError> {
	let target = required("target", &req.target, MAX_TARGET_LEN)?;
	let build_tag = required("build_tag", &req.build_tag, MAX_BUILD_TAG_LEN)?;
	let repo_root = match optional(req.repo_root.as_deref()) {
		Some(root) => bounded("repo_root", root, MAX_REPO_ROOT_LEN)?,
		None => derive_repo_root(&build_tag),
	};
	let git_branch = optional(req.git_branch.as_deref())
		.map(|b| bounded("git_branch", b, MAX_BRANCH_LEN))
		.transpose()?;
	let script_hash = required("script_hash", &req.script_hash, MAX_HASH_LEN)?;
	let db_hash = required("db_hash", &req.db_hash, MAX_HASH_LEN)?;

	Ok(NewVersion {
		target,
		build_tag,
		repo_root,
		git_branch,
		script_hash,
		db_hash,
	})
}
