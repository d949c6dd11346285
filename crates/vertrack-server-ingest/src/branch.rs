// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{IngestError, Result};

pub const MAX_REVISION_LEN: usize = 64;

/// Allowed branch names and the source URL each one is fetched from.
///
/// Built from validated configuration; lookups are exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchTable {
	branches: BTreeMap<String, String>,
}

impl BranchTable {
	pub fn new(branches: BTreeMap<String, String>) -> Self {
		Self { branches }
	}

	pub fn resolve(&self, name: &str) -> Result<&str> {
		self
			.branches
			.get(name)
			.map(String::as_str)
			.ok_or_else(|| IngestError::UnknownBranch(name.to_string()))
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.branches.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self
			.branches
			.iter()
			.map(|(name, url)| (name.as_str(), url.as_str()))
	}

	pub fn len(&self) -> usize {
		self.branches.len()
	}

	pub fn is_empty(&self) -> bool {
		self.branches.is_empty()
	}
}

/// Revisions end up in build tags and command lines, so only plain tokens are accepted.
pub fn validate_revision(revision: &str) -> Result<&str> {
	if revision.is_empty() {
		return Err(IngestError::InvalidRevision("revision is empty".to_string()));
	}
	if revision.chars().count() > MAX_REVISION_LEN {
		return Err(IngestError::InvalidRevision(format!(
			"revision exceeds {MAX_REVISION_LEN} characters"
		)));
	}
	if revision
		.chars()
		.any(|c| c.is_whitespace() || c.is_control() || c == '/' || c == '\\')
	{
		return Err(IngestError::InvalidRevision(format!(
			"revision '{}' contains whitespace or path separators",
			revision.escape_debug()
		)));
	}
	Ok(revision)
}

/// `YYYYMMDD_<revision>`
pub fn derive_build_tag(date: NaiveDate, revision: &str) -> String {
	format!("{}_{}", date.format("%Y%m%d"), revision)
}
