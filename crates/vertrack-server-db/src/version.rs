// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::error::{DbError, Result};

const SELECT_COLUMNS: &str = "SELECT id, target, build_tag, repo_root, git_branch, script_hash, db_hash, created_at, updated_at FROM versions";

type VersionRow = (
	i64,
	String,
	String,
	String,
	Option<String>,
	String,
	String,
	String,
	String,
);

/// Placeholder values stored in a hash column instead of a real hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashSentinel {
	Processing,
	Unknown,
	Error,
}

impl HashSentinel {
	pub fn as_str(&self) -> &'static str {
		match self {
			HashSentinel::Processing => "processing",
			HashSentinel::Unknown => "unknown",
			HashSentinel::Error => "error",
		}
	}

	pub fn matches(&self, value: &str) -> bool {
		value == self.as_str()
	}
}

impl std::fmt::Display for HashSentinel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for HashSentinel {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"processing" => Ok(HashSentinel::Processing),
			"unknown" => Ok(HashSentinel::Unknown),
			"error" => Ok(HashSentinel::Error),
			_ => Err(format!("not a hash sentinel: {s}")),
		}
	}
}

/// A stored build version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VersionRecord {
	pub id: i64,
	pub target: String,
	pub build_tag: String,
	pub repo_root: String,
	pub git_branch: Option<String>,
	pub script_hash: String,
	pub db_hash: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl VersionRecord {
	/// True while an ingest job still owns this record.
	pub fn is_processing(&self) -> bool {
		HashSentinel::Processing.matches(&self.script_hash)
			|| HashSentinel::Processing.matches(&self.db_hash)
	}
}

/// Field values for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
	pub target: String,
	pub build_tag: String,
	pub repo_root: String,
	pub git_branch: Option<String>,
	pub script_hash: String,
	pub db_hash: String,
}

/// Partial update of a record's hash columns. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPatch {
	pub script_hash: Option<String>,
	pub db_hash: Option<String>,
}

impl VersionPatch {
	pub fn hashes(script_hash: impl Into<String>, db_hash: impl Into<String>) -> Self {
		Self {
			script_hash: Some(script_hash.into()),
			db_hash: Some(db_hash.into()),
		}
	}

	pub fn sentinel(sentinel: HashSentinel) -> Self {
		Self::hashes(sentinel.as_str(), sentinel.as_str())
	}
}

/// Branch predicate for [`VersionStore::get_latest_by_filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchFilter {
	Any,
	Exact(String),
	Prefix(String),
}

impl BranchFilter {
	/// Build a filter from an optional query value; a trailing `*` selects a prefix match.
	pub fn parse(value: Option<&str>) -> Self {
		match value.map(str::trim).filter(|v| !v.is_empty()) {
			None => BranchFilter::Any,
			Some(v) => match v.strip_suffix('*') {
				Some(prefix) => BranchFilter::Prefix(prefix.to_string()),
				None => BranchFilter::Exact(v.to_string()),
			},
		}
	}
}

fn now_timestamp() -> String {
	format_timestamp(Utc::now())
}

fn format_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp '{value}': {e}")))
}

fn row_to_record(row: VersionRow) -> Result<VersionRecord> {
	let (id, target, build_tag, repo_root, git_branch, script_hash, db_hash, created_at, updated_at) =
		row;
	Ok(VersionRecord {
		id,
		target,
		build_tag,
		repo_root,
		git_branch,
		script_hash,
		db_hash,
		created_at: parse_timestamp("created_at", &created_at)?,
		updated_at: parse_timestamp("updated_at", &updated_at)?,
	})
}

#[derive(Clone)]
pub struct VersionRepository {
	pool: SqlitePool,
}

impl VersionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	#[tracing::instrument(skip(self, new), fields(target = %new.target, build_tag = %new.build_tag))]
	pub async fn insert(&self, new: &NewVersion) -> Result<VersionRecord> {
		let now = now_timestamp();
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			r#"
			INSERT INTO versions (target, build_tag, repo_root, git_branch, script_hash, db_hash, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&new.target)
		.bind(&new.build_tag)
		.bind(&new.repo_root)
		.bind(&new.git_branch)
		.bind(&new.script_hash)
		.bind(&new.db_hash)
		.bind(&now)
		.bind(&now)
		.execute(&mut *tx)
		.await?;

		let id = result.last_insert_rowid();
		let row = sqlx::query_as::<_, VersionRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
			.bind(id)
			.fetch_one(&mut *tx)
			.await?;

		tx.commit().await?;

		tracing::debug!(id, "version inserted");
		row_to_record(row)
	}

	#[tracing::instrument(skip(self, patch))]
	pub async fn update(&self, id: i64, patch: &VersionPatch) -> Result<VersionRecord> {
		let result = sqlx::query(
			r#"
			UPDATE versions
			SET script_hash = COALESCE(?, script_hash),
				db_hash = COALESCE(?, db_hash),
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&patch.script_hash)
		.bind(&patch.db_hash)
		.bind(now_timestamp())
		.bind(id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("version {id}")));
		}

		self
			.get_by_id(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("version {id}")))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_by_id(&self, id: i64) -> Result<Option<VersionRecord>> {
		let row = sqlx::query_as::<_, VersionRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		row.map(row_to_record).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_page(&self, offset: i64, limit: i64) -> Result<(Vec<VersionRecord>, i64)> {
		let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM versions")
			.fetch_one(&self.pool)
			.await?;

		let rows = sqlx::query_as::<_, VersionRow>(&format!(
			"{SELECT_COLUMNS} ORDER BY id ASC LIMIT ? OFFSET ?"
		))
		.bind(limit.max(0))
		.bind(offset.max(0))
		.fetch_all(&self.pool)
		.await?;

		let versions = rows
			.into_iter()
			.map(row_to_record)
			.collect::<Result<Vec<_>>>()?;
		Ok((versions, total))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_latest(&self) -> Result<Option<VersionRecord>> {
		let row = sqlx::query_as::<_, VersionRow>(&format!(
			"{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT 1"
		))
		.fetch_optional(&self.pool)
		.await?;

		row.map(row_to_record).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_latest_by_filter(
		&self,
		target: Option<&str>,
		branch: &BranchFilter,
	) -> Result<Option<VersionRecord>> {
		let mut sql = format!("{SELECT_COLUMNS} WHERE 1 = 1");
		if target.is_some() {
			sql.push_str(" AND target = ?");
		}
		match branch {
			BranchFilter::Any => {}
			BranchFilter::Exact(_) => sql.push_str(" AND git_branch = ?"),
			BranchFilter::Prefix(_) => sql.push_str(" AND substr(git_branch, 1, length(?)) = ?"),
		}
		sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT 1");

		let mut query = sqlx::query_as::<_, VersionRow>(&sql);
		if let Some(target) = target {
			query = query.bind(target);
		}
		match branch {
			BranchFilter::Any => {}
			BranchFilter::Exact(name) => query = query.bind(name),
			BranchFilter::Prefix(prefix) => query = query.bind(prefix).bind(prefix),
		}

		let row = query.fetch_optional(&self.pool).await?;
		row.map(row_to_record).transpose()
	}

	/// Mark records left in `processing` by an interrupted ingest as `error`.
	#[tracing::instrument(skip(self))]
	pub async fn fail_stale_processing(&self) -> Result<u64> {
		let processing = HashSentinel::Processing.as_str();
		let error = HashSentinel::Error.as_str();
		let result = sqlx::query(
			r#"
			UPDATE versions
			SET script_hash = ?, db_hash = ?, updated_at = ?
			WHERE script_hash = ? OR db_hash = ?
			"#,
		)
		.bind(error)
		.bind(error)
		.bind(now_timestamp())
		.bind(processing)
		.bind(processing)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}
}

#[async_trait]
pub trait VersionStore: Send + Sync {
	async fn insert(&self, new: &NewVersion) -> Result<VersionRecord>;
	async fn update(&self, id: i64, patch: &VersionPatch) -> Result<VersionRecord>;
	async fn get_by_id(&self, id: i64) -> Result<Option<VersionRecord>>;
	async fn list_page(&self, offset: i64, limit: i64) -> Result<(Vec<VersionRecord>, i64)>;
	async fn get_latest(&self) -> Result<Option<VersionRecord>>;
	async fn get_latest_by_filter(
		&self,
		target: Option<&str>,
		branch: &BranchFilter,
	) -> Result<Option<VersionRecord>>;
	async fn fail_stale_processing(&self) -> Result<u64>;
}

#[async_trait]
impl VersionStore for VersionRepository {
	async fn insert(&self, new: &NewVersion) -> Result<VersionRecord> {
		self.insert(new).await
	}

	async fn update(&self, id: i64, patch: &VersionPatch) -> Result<VersionRecord> {
		self.update(id, patch).await
	}

	async fn get_by_id(&self, id: i64) -> Result<Option<VersionRecord>> {
		self.get_by_id(id).await
	}

	async fn list_page(&self, offset: i64, limit: i64) -> Result<(Vec<VersionRecord>, i64)> {
		self.list_page(offset, limit).await
	}

	async fn get_latest(&self) -> Result<Option<VersionRecord>> {
		self.get_latest().await
	}

	async fn get_latest_by_filter(
		&self,
		target: Option<&str>,
		branch: &BranchFilter,
	) -> Result<Option<VersionRecord>> {
		self.get_latest_by_filter(target, branch).await
	}

	async fn fail_stale_processing(&self) -> Result<u64> {
		self.fail_stale_processing().await
	}
}
