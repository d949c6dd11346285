// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS versions (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		target VARCHAR(100) NOT NULL,
		build_tag VARCHAR(100) NOT NULL,
		repo_root VARCHAR(500) NOT NULL,
		git_branch VARCHAR(100),
		script_hash VARCHAR(255) NOT NULL,
		db_hash VARCHAR(255) NOT NULL,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_versions_target ON versions(target)",
	"CREATE INDEX IF NOT EXISTS idx_versions_build_tag ON versions(build_tag)",
	"CREATE INDEX IF NOT EXISTS idx_versions_created_at ON versions(created_at)",
];

/// Connection limits for [`create_pool_with_settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
	pub max_connections: u32,
	/// How long a connection waits on SQLite's write lock.
	pub busy_timeout: Duration,
}

impl Default for PoolSettings {
	fn default() -> Self {
		Self {
			max_connections: 5,
			busy_timeout: Duration::from_secs(5),
		}
	}
}

/// Create a SqlitePool with WAL mode and default [`PoolSettings`].
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./vertrack.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	create_pool_with_settings(database_url, PoolSettings::default()).await
}

#[tracing::instrument(skip(database_url))]
pub async fn create_pool_with_settings(
	database_url: &str,
	settings: PoolSettings,
) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.busy_timeout(settings.busy_timeout)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(settings.max_connections.max(1))
		.connect_with(options)
		.await?;

	tracing::debug!(max_connections = settings.max_connections, "database pool created");
	Ok(pool)
}

/// Create the `versions` table and its indexes if they do not exist yet.
///
/// Safe to run on every startup.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in SCHEMA {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("database schema is up to date");
	Ok(())
}

/// Liveness check used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query("SELECT 1").execute(pool).await?;
	Ok(())
}
