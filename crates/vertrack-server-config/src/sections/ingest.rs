// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build-ingest pipeline configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_WORK_DIR: &str = "./work";
const DEFAULT_EXPORTER_PATH: &str = "./tools/hash_exporter";
const DEFAULT_EXPORTER_CONFIG_PATH: &str = "./tools/hash_exporter.json";
const DEFAULT_EXPORTER_TIMEOUT_SECS: u64 = 300;
const DEFAULT_ARTIFACT_PATH: &str = "bin/game.pak";
const DEFAULT_TREE_PATH: &str = "data";
const DEFAULT_TARGET: &str = "client";
const DEFAULT_QUEUE_CAPACITY: usize = 16;

const MAX_BRANCH_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
	/// Root under which one working directory per branch is created.
	pub work_dir: PathBuf,
	pub exporter_path: PathBuf,
	pub exporter_config_path: PathBuf,
	pub exporter_args: Vec<String>,
	pub exporter_timeout_secs: u64,
	/// File fetched from the branch URL, relative to it.
	pub artifact_path: String,
	/// Directory tree checked out from the branch URL, relative to it.
	pub tree_path: String,
	/// `target` stamped on records created by the pipeline.
	pub target: String,
	/// Pending jobs allowed per branch before triggers are refused.
	pub queue_capacity: usize,
	/// Allowed branch names mapped to their source URLs.
	pub branches: BTreeMap<String, String>,
}

impl Default for IngestConfig {
	fn default() -> Self {
		IngestConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfigLayer {
	#[serde(default)]
	pub work_dir: Option<PathBuf>,
	#[serde(default)]
	pub exporter_path: Option<PathBuf>,
	#[serde(default)]
	pub exporter_config_path: Option<PathBuf>,
	#[serde(default)]
	pub exporter_args: Option<Vec<String>>,
	#[serde(default)]
	pub exporter_timeout_secs: Option<u64>,
	#[serde(default)]
	pub artifact_path: Option<String>,
	#[serde(default)]
	pub tree_path: Option<String>,
	#[serde(default)]
	pub target: Option<String>,
	#[serde(default)]
	pub queue_capacity: Option<usize>,
	#[serde(default)]
	pub branches: Option<BTreeMap<String, String>>,
}

impl IngestConfigLayer {
	pub fn merge(&mut self, other: IngestConfigLayer) {
		if other.work_dir.is_some() {
			self.work_dir = other.work_dir;
		}
		if other.exporter_path.is_some() {
			self.exporter_path = other.exporter_path;
		}
		if other.exporter_config_path.is_some() {
			self.exporter_config_path = other.exporter_config_path;
		}
		if other.exporter_args.is_some() {
			self.exporter_args = other.exporter_args;
		}
		if other.exporter_timeout_secs.is_some() {
			self.exporter_timeout_secs = other.exporter_timeout_secs;
		}
		if other.artifact_path.is_some() {
			self.artifact_path = other.artifact_path;
		}
		if other.tree_path.is_some() {
			self.tree_path = other.tree_path;
		}
		if other.target.is_some() {
			self.target = other.target;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		// A branch table from a higher-precedence source replaces the whole table.
		if other.branches.is_some() {
			self.branches = other.branches;
		}
	}

	pub fn finalize(self) -> IngestConfig {
		IngestConfig {
			work_dir: self
				.work_dir
				.unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
			exporter_path: self
				.exporter_path
				.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORTER_PATH)),
			exporter_config_path: self
				.exporter_config_path
				.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORTER_CONFIG_PATH)),
			exporter_args: self.exporter_args.unwrap_or_default(),
			exporter_timeout_secs: self
				.exporter_timeout_secs
				.unwrap_or(DEFAULT_EXPORTER_TIMEOUT_SECS),
			artifact_path: self
				.artifact_path
				.unwrap_or_else(|| DEFAULT_ARTIFACT_PATH.to_string()),
			tree_path: self
				.tree_path
				.unwrap_or_else(|| DEFAULT_TREE_PATH.to_string()),
			target: self.target.unwrap_or_else(|| DEFAULT_TARGET.to_string()),
			queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
			branches: self.branches.unwrap_or_default(),
		}
	}
}

/// Branch names double as working directory names, so they are restricted to
/// a single safe path component.
pub fn is_valid_branch_name(name: &str) -> bool {
	!name.is_empty()
		&& name.len() <= MAX_BRANCH_NAME_LEN
		&& name != "."
		&& name != ".."
		&& name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
