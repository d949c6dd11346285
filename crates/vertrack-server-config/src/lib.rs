// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the vertrack server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`VERTRACK_*`)
//!
//! # Usage
//!
//! ```ignore
//! use vertrack_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	load_secret_env, parse_branch_list, ConfigSource, DefaultsSource, EnvSource, Precedence,
	TomlSource, SYSTEM_CONFIG_PATH,
};

use std::collections::HashSet;

use tracing::{debug, info, warn};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub notify: NotifyConfig,
	pub vcs: VcsConfig,
	pub ingest: IngestConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}

	/// Log the resolved configuration at `info`. Secrets are reported only as present or absent.
	///
	/// Call after the tracing subscriber is installed.
	pub fn log_summary(&self) {
		info!(
			host = %self.http.host,
			port = self.http.port,
			database = %self.database.url,
			db_max_connections = self.database.max_connections,
			db_busy_timeout_secs = self.database.busy_timeout_secs,
			log_level = %self.logging.level,
			webhook_configured = self.notify.is_configured(),
			vcs_program = %self.vcs.program,
			vcs_user = %self.vcs.username,
			vcs_password_set = self.vcs.password.is_some(),
			work_dir = %self.ingest.work_dir.display(),
			branches = ?self.ingest.branches.keys().collect::<Vec<_>>(),
			"Server configuration loaded"
		);
		if self.database.is_in_memory() {
			warn!("database is in memory, versions will be lost on restart");
		}
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`VERTRACK_*`)
/// 2. Config file (`/etc/vertrack/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		notify: layer.notify.unwrap_or_default().finalize(),
		vcs: layer.vcs.unwrap_or_default().finalize(),
		ingest: layer.ingest.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	Ok(config)
}

/// Validate cross-field configuration rules.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.http.port == 0 {
		return Err(ConfigError::Validation("http port must be non-zero".to_string()));
	}
	if config.database.max_connections == 0 {
		return Err(ConfigError::Validation(
			"database max_connections must be non-zero".to_string(),
		));
	}
	if config.notify.timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"notify timeout_secs must be non-zero".to_string(),
		));
	}
	if config.vcs.timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"vcs timeout_secs must be non-zero".to_string(),
		));
	}
	if config.ingest.exporter_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"ingest exporter_timeout_secs must be non-zero".to_string(),
		));
	}
	if config.ingest.queue_capacity == 0 {
		return Err(ConfigError::Validation(
			"ingest queue_capacity must be non-zero".to_string(),
		));
	}

	validate_branches(&config.ingest)?;

	if !config.ingest.branches.is_empty() && config.vcs.username.trim().is_empty() {
		return Err(ConfigError::Validation(
			"ingest branches are configured but VERTRACK_VCS_USERNAME is not set".to_string(),
		));
	}

	Ok(())
}

fn validate_branches(ingest: &IngestConfig) -> Result<(), ConfigError> {
	let mut seen = HashSet::new();
	for (name, source) in &ingest.branches {
		if !is_valid_branch_name(name) {
			return Err(ConfigError::Validation(format!(
				"branch name '{name}' must be 1-64 characters of [A-Za-z0-9._-]"
			)));
		}
		if !seen.insert(name.to_ascii_lowercase()) {
			return Err(ConfigError::Validation(format!(
				"branch '{name}' is configured more than once (names are case-insensitive)"
			)));
		}
		url::Url::parse(source).map_err(|e| {
			ConfigError::Validation(format!("branch '{name}' has an invalid source URL: {e}"))
		})?;
	}
	Ok(())
}
