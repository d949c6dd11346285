// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version store (SQLite) settings.

use serde::Deserialize;

const DEFAULT_URL: &str = "sqlite:./vertrack.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Where versions are stored and how the pool talks to SQLite.
///
/// Ingest workers and HTTP handlers write concurrently, so `busy_timeout_secs`
/// bounds how long a writer waits on SQLite's file lock before failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
	pub url: String,
	pub max_connections: u32,
	pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			max_connections: DEFAULT_MAX_CONNECTIONS,
			busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
		}
	}
}

impl DatabaseConfig {
	/// In-memory databases vanish with the process and are per connection.
	pub fn is_in_memory(&self) -> bool {
		let rest = self.url.strip_prefix("sqlite:").unwrap_or(&self.url);
		let rest = rest.trim_start_matches("//");
		rest.starts_with(":memory:") || rest.contains("mode=memory")
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub max_connections: Option<u32>,
	#[serde(default)]
	pub busy_timeout_secs: Option<u64>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
		if other.busy_timeout_secs.is_some() {
			self.busy_timeout_secs = other.busy_timeout_secs;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		let defaults = DatabaseConfig::default();
		DatabaseConfig {
			url: self.url.unwrap_or(defaults.url),
			max_connections: self.max_connections.unwrap_or(defaults.max_connections),
			busy_timeout_secs: self.busy_timeout_secs.unwrap_or(defaults.busy_timeout_secs),
		}
	}
}
