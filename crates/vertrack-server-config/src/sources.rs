// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files, environment variables.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, trace};
use vertrack_common_secret::SecretString;

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, HttpConfigLayer, IngestConfigLayer, LoggingConfigLayer, NotifyConfigLayer,
	VcsConfigLayer,
};

/// Default location of the system-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/vertrack/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `VERTRACK_<SECTION>_<FIELD>`, except for the listener
/// (`VERTRACK_HOST`, `VERTRACK_PORT`).
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()?),
			logging: Some(load_logging_from_env()?),
			notify: Some(load_notify_from_env()?),
			vcs: Some(load_vcs_from_env()?),
			ingest: Some(load_ingest_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

/// Load a secret from `NAME`, or from the file named by `NAME_FILE`.
///
/// The direct variable wins when both are set. File contents are trimmed.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, ConfigError> {
	if let Some(value) = env_var(name) {
		return Ok(Some(SecretString::new(value)));
	}

	let file_var = format!("{name}_FILE");
	match env_var(&file_var) {
		Some(path) => {
			let content = std::fs::read_to_string(&path)
				.map_err(|e| ConfigError::Secret(format!("{file_var}: cannot read {path}: {e}")))?;
			let trimmed = content.trim();
			if trimmed.is_empty() {
				Ok(None)
			} else {
				Ok(Some(SecretString::new(trimmed.to_string())))
			}
		}
		None => Ok(None),
	}
}

/// Parse `name=url,name=url` into a branch table.
pub fn parse_branch_list(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
	let mut branches = BTreeMap::new();
	for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
		let (name, url) = entry
			.split_once('=')
			.ok_or_else(|| ConfigError::InvalidValue {
				key: "VERTRACK_INGEST_BRANCHES".to_string(),
				message: format!("expected name=url, got '{entry}'"),
			})?;
		branches.insert(name.trim().to_string(), url.trim().to_string());
	}
	Ok(branches)
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("VERTRACK_HOST"),
		port: env_parse("VERTRACK_PORT", "u16")?,
	})
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("VERTRACK_DATABASE_URL"),
		max_connections: env_parse("VERTRACK_DATABASE_MAX_CONNECTIONS", "u32")?,
		busy_timeout_secs: env_parse("VERTRACK_DATABASE_BUSY_TIMEOUT_SECS", "u64")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("VERTRACK_LOG_FORMAT") {
		Some(v) => Some(v.parse().map_err(|message| ConfigError::InvalidValue {
			key: "VERTRACK_LOG_FORMAT".to_string(),
			message,
		})?),
		None => None,
	};
	Ok(LoggingConfigLayer {
		level: env_var("VERTRACK_LOG_LEVEL"),
		format,
	})
}

fn load_notify_from_env() -> Result<NotifyConfigLayer, ConfigError> {
	Ok(NotifyConfigLayer {
		webhook_url: load_secret_env("VERTRACK_NOTIFY_WEBHOOK_URL")?,
		timeout_secs: env_parse("VERTRACK_NOTIFY_TIMEOUT_SECS", "u64")?,
	})
}

fn load_vcs_from_env() -> Result<VcsConfigLayer, ConfigError> {
	Ok(VcsConfigLayer {
		program: env_var("VERTRACK_VCS_PROGRAM"),
		username: env_var("VERTRACK_VCS_USERNAME"),
		password: load_secret_env("VERTRACK_VCS_PASSWORD")?,
		timeout_secs: env_parse("VERTRACK_VCS_TIMEOUT_SECS", "u64")?,
	})
}

fn load_ingest_from_env() -> Result<IngestConfigLayer, ConfigError> {
	let branches = match env_var("VERTRACK_INGEST_BRANCHES") {
		Some(raw) => Some(parse_branch_list(&raw)?),
		None => None,
	};
	Ok(IngestConfigLayer {
		work_dir: env_var("VERTRACK_INGEST_WORK_DIR").map(PathBuf::from),
		exporter_path: env_var("VERTRACK_INGEST_EXPORTER_PATH").map(PathBuf::from),
		exporter_config_path: env_var("VERTRACK_INGEST_EXPORTER_CONFIG_PATH").map(PathBuf::from),
		exporter_args: env_var("VERTRACK_INGEST_EXPORTER_ARGS")
			.map(|v| v.split_whitespace().map(str::to_string).collect()),
		exporter_timeout_secs: env_parse("VERTRACK_INGEST_EXPORTER_TIMEOUT_SECS", "u64")?,
		artifact_path: env_var("VERTRACK_INGEST_ARTIFACT_PATH"),
		tree_path: env_var("VERTRACK_INGEST_TREE_PATH"),
		target: env_var("VERTRACK_INGEST_TARGET"),
		queue_capacity: env_parse("VERTRACK_INGEST_QUEUE_CAPACITY", "usize")?,
		branches,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_parse_branch_list() {
		let branches =
			parse_branch_list("main=svn://vcs/trunk, live = svn://vcs/branches/live,").unwrap();
		assert_eq!(branches.len(), 2);
		assert_eq!(branches["main"], "svn://vcs/trunk");
		assert_eq!(branches["live"], "svn://vcs/branches/live");
	}

	#[test]
	fn test_parse_branch_list_rejects_missing_separator() {
		let err = parse_branch_list("main").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let layer = TomlSource::new("/nonexistent/vertrack.toml").load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.ingest.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[database]\nurl = \"sqlite:/tmp/test.db\"\nmax_connections = 2"
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let database = layer.database.unwrap();
		assert_eq!(database.url.as_deref(), Some("sqlite:/tmp/test.db"));
		assert_eq!(database.max_connections, Some(2));
		assert_eq!(database.busy_timeout_secs, None);
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[http\nport = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}
}
