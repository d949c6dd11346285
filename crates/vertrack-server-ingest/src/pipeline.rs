// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};
use vertrack_server_config::IngestConfig;
use vertrack_server_db::{HashSentinel, NewVersion, VersionPatch, VersionRecord, VersionStore};
use vertrack_server_notify::Notifier;

use crate::branch::derive_build_tag;
use crate::error::{IngestError, Result};
use crate::exporter::Exporter;
use crate::health::JobOutcome;
use crate::report::HashReport;
use crate::vcs::{FetchPlan, VcsClient};

const FALLBACK_EXPORTER_NAME: &str = "hash_exporter";

/// Paths and names the pipeline needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
	pub work_dir: PathBuf,
	pub exporter_path: PathBuf,
	pub exporter_config_path: PathBuf,
	pub artifact_path: String,
	pub tree_path: String,
	pub target: String,
}

impl IngestSettings {
	/// Resolve the configured paths against the current directory.
	///
	/// Child processes run with a branch directory as their cwd, so every
	/// path handed to them must already be absolute.
	pub fn from_config(config: &IngestConfig) -> Result<Self> {
		Ok(Self {
			work_dir: std::path::absolute(&config.work_dir)?,
			exporter_path: std::path::absolute(&config.exporter_path)?,
			exporter_config_path: std::path::absolute(&config.exporter_config_path)?,
			artifact_path: config.artifact_path.clone(),
			tree_path: config.tree_path.clone(),
			target: config.target.clone(),
		})
	}

	pub fn branch_dir(&self, branch: &str) -> PathBuf {
		self.work_dir.join(branch)
	}

	/// Name the exporter has inside each working directory.
	pub fn exporter_file_name(&self) -> String {
		self
			.exporter_path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| FALLBACK_EXPORTER_NAME.to_string())
	}
}

/// A queued ingest for one placeholder record.
#[derive(Debug, Clone)]
pub struct IngestJob {
	pub record: VersionRecord,
	pub branch: String,
	pub url: String,
	pub revision: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
	Checkout,
	Update,
}

/// What one pipeline run did to its record.
#[derive(Debug, Clone)]
pub struct JobResult {
	pub record: VersionRecord,
	pub outcome: JobOutcome,
	pub error: Option<String>,
}

pub struct IngestPipeline {
	settings: IngestSettings,
	store: Arc<dyn VersionStore>,
	vcs: Arc<dyn VcsClient>,
	exporter: Arc<dyn Exporter>,
	notifier: Arc<dyn Notifier>,
}

impl IngestPipeline {
	pub fn new(
		settings: IngestSettings,
		store: Arc<dyn VersionStore>,
		vcs: Arc<dyn VcsClient>,
		exporter: Arc<dyn Exporter>,
		notifier: Arc<dyn Notifier>,
	) -> Self {
		Self {
			settings,
			store,
			vcs,
			exporter,
			notifier,
		}
	}

	pub fn settings(&self) -> &IngestSettings {
		&self.settings
	}

	pub fn store(&self) -> &Arc<dyn VersionStore> {
		&self.store
	}

	/// Record written before the job is queued; both hashes are `processing`.
	pub fn placeholder(&self, branch: &str, url: &str, revision: &str, date: NaiveDate) -> NewVersion {
		NewVersion {
			target: self.settings.target.clone(),
			build_tag: derive_build_tag(date, revision),
			repo_root: url.to_string(),
			git_branch: Some(branch.to_string()),
			script_hash: HashSentinel::Processing.as_str().to_string(),
			db_hash: HashSentinel::Processing.as_str().to_string(),
		}
	}

	fn plan(&self, job: &IngestJob) -> FetchPlan {
		FetchPlan {
			url: job.url.clone(),
			dir: self.settings.branch_dir(&job.branch),
			tree_path: self.settings.tree_path.clone(),
			artifact_path: self.settings.artifact_path.clone(),
		}
	}

	/// Bring the branch working directory up to date.
	///
	/// A missing directory is created, seeded with the exporter and its config
	/// and checked out. If any of that fails the directory is removed again.
	#[instrument(skip(self, job), fields(branch = %job.branch))]
	pub async fn fetch(&self, job: &IngestJob) -> Result<FetchKind> {
		let plan = self.plan(job);

		if tokio::fs::try_exists(&plan.dir).await? {
			self.vcs.update(&plan).await?;
			return Ok(FetchKind::Update);
		}

		tokio::fs::create_dir_all(&plan.dir).await?;
		let seeded = async {
			copy_into(&self.settings.exporter_path, &plan.dir).await?;
			copy_into(&self.settings.exporter_config_path, &plan.dir).await?;
			self.vcs.checkout(&plan).await
		}
		.await;

		if let Err(e) = seeded {
			if let Err(rm) = tokio::fs::remove_dir_all(&plan.dir).await {
				warn!(dir = %plan.dir.display(), error = %rm, "failed to remove partial checkout");
			}
			return Err(e);
		}

		Ok(FetchKind::Checkout)
	}

	/// Run the exporter and parse its report. A report naming only one hash is an error.
	#[instrument(skip(self))]
	pub async fn extract(&self, work_dir: &Path) -> Result<HashReport> {
		let stdout = self.exporter.run(work_dir).await?;
		let report = HashReport::from_output(&stdout);
		if report.is_partial() {
			return Err(IngestError::PartialReport(report.missing[0]));
		}
		if !report.missing.is_empty() {
			warn!("exporter reported no hashes");
		}
		Ok(report)
	}

	/// Fetch, extract, then patch the record and notify exactly once.
	#[instrument(skip(self, job), fields(version_id = job.record.id, branch = %job.branch, revision = %job.revision))]
	pub async fn run(&self, job: &IngestJob) -> JobResult {
		let outcome = async {
			let kind = self.fetch(job).await?;
			info!(?kind, "working directory ready");
			self
				.extract(&self.settings.branch_dir(&job.branch))
				.await
		}
		.await;

		match outcome {
			Ok(report) => {
				let patch = VersionPatch::hashes(report.script_hash, report.db_hash);
				let record = self.commit(job, &patch).await;
				info!("ingest succeeded");
				JobResult {
					record,
					outcome: JobOutcome::Succeeded,
					error: None,
				}
			}
			Err(e) => {
				error!(error = %e, "ingest failed");
				let record = self
					.commit(job, &VersionPatch::sentinel(HashSentinel::Error))
					.await;
				JobResult {
					record,
					outcome: JobOutcome::Failed,
					error: Some(e.to_string()),
				}
			}
		}
	}

	/// Settle a job that will never run.
	#[instrument(skip(self, job), fields(version_id = job.record.id, branch = %job.branch))]
	pub async fn abandon(&self, job: &IngestJob) -> JobResult {
		warn!("abandoning queued ingest");
		let record = self
			.commit(job, &VersionPatch::sentinel(HashSentinel::Error))
			.await;
		JobResult {
			record,
			outcome: JobOutcome::Abandoned,
			error: Some(IngestError::ShuttingDown.to_string()),
		}
	}

	async fn commit(&self, job: &IngestJob, patch: &VersionPatch) -> VersionRecord {
		let record = match self.store.update(job.record.id, patch).await {
			Ok(record) => record,
			Err(e) => {
				error!(error = %e, "failed to store ingest result");
				let mut record = job.record.clone();
				if let Some(script_hash) = &patch.script_hash {
					record.script_hash = script_hash.clone();
				}
				if let Some(db_hash) = &patch.db_hash {
					record.db_hash = db_hash.clone();
				}
				record
			}
		};

		if !self.notifier.notify(&record).await {
			warn!("ingest notification not delivered");
		}
		record
	}
}

async fn copy_into(source: &Path, dir: &Path) -> Result<()> {
	let name = source.file_name().ok_or_else(|| {
		IngestError::Io(std::io::Error::new(
			std::io::ErrorKind::InvalidInput,
			format!("{} has no file name", source.display()),
		))
	})?;
	tokio::fs::copy(source, dir.join(name)).await?;
	Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::branch::BranchTable;
	use async_trait::async_trait;
	use std::collections::BTreeMap;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;
	use tokio::sync::Mutex;
	use vertrack_server_db::testing::create_version_test_pool;
	use vertrack_server_db::VersionRepository;

	#[derive(Default)]
	pub struct MockVcs {
		pub calls: Mutex<Vec<(&'static str, PathBuf)>>,
		pub fail_checkout: bool,
		pub fail_update: bool,
	}

	#[async_trait]
	impl VcsClient for MockVcs {
		async fn checkout(&self, plan: &FetchPlan) -> Result<()> {
			self.calls.lock().await.push(("checkout", plan.dir.clone()));
			if self.fail_checkout {
				return Err(IngestError::CommandFailed {
					program: "svn".to_string(),
					args: "checkout".to_string(),
					status: "exit status: 1".to_string(),
					stderr: "E170013".to_string(),
				});
			}
			tokio::fs::create_dir_all(plan.tree_dir()).await?;
			Ok(())
		}

		async fn update(&self, plan: &FetchPlan) -> Result<()> {
			self.calls.lock().await.push(("update", plan.dir.clone()));
			if self.fail_update {
				return Err(IngestError::Timeout {
					program: "svn".to_string(),
					secs: 600,
				});
			}
			Ok(())
		}
	}

	/// Returns a fixed stdout, optionally after a delay, tracking peak concurrency.
	pub struct MockExporter {
		pub output: std::result::Result<String, String>,
		pub delay: Duration,
		pub active: AtomicUsize,
		pub peak: AtomicUsize,
		pub panics: bool,
	}

	impl MockExporter {
		pub fn reporting(output: &str) -> Self {
			Self {
				output: Ok(output.to_string()),
				delay: Duration::ZERO,
				active: AtomicUsize::new(0),
				peak: AtomicUsize::new(0),
				panics: false,
			}
		}

		pub fn failing(message: &str) -> Self {
			Self {
				output: Err(message.to_string()),
				..Self::reporting("")
			}
		}
	}

	#[async_trait]
	impl Exporter for MockExporter {
		async fn run(&self, _work_dir: &Path) -> Result<String> {
			if self.panics {
				panic!("exporter crashed");
			}
			let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
			self.peak.fetch_max(now, Ordering::SeqCst);
			tokio::time::sleep(self.delay).await;
			self.active.fetch_sub(1, Ordering::SeqCst);
			match &self.output {
				Ok(stdout) => Ok(stdout.clone()),
				Err(message) => Err(IngestError::CommandFailed {
					program: "hash_exporter".to_string(),
					args: String::new(),
					status: "exit status: 2".to_string(),
					stderr: message.clone(),
				}),
			}
		}
	}

	#[derive(Default)]
	pub struct RecordingNotifier {
		pub sent: Mutex<Vec<VersionRecord>>,
	}

	#[async_trait]
	impl Notifier for RecordingNotifier {
		async fn notify(&self, record: &VersionRecord) -> bool {
			self.sent.lock().await.push(record.clone());
			true
		}
	}

	pub struct Fixture {
		pub work: tempfile::TempDir,
		pub tools: tempfile::TempDir,
		pub store: Arc<VersionRepository>,
		pub vcs: Arc<MockVcs>,
		pub exporter: Arc<MockExporter>,
		pub notifier: Arc<RecordingNotifier>,
		pub pipeline: Arc<IngestPipeline>,
	}

	impl Fixture {
		pub async fn new(vcs: MockVcs, exporter: MockExporter) -> Self {
			let work = tempfile::tempdir().unwrap();
			let tools = tempfile::tempdir().unwrap();
			std::fs::write(tools.path().join("hash_exporter"), "#!/bin/sh\n").unwrap();
			std::fs::write(tools.path().join("hash_exporter.json"), "{}").unwrap();

			let settings = IngestSettings {
				work_dir: work.path().to_path_buf(),
				exporter_path: tools.path().join("hash_exporter"),
				exporter_config_path: tools.path().join("hash_exporter.json"),
				artifact_path: "bin/game.pak".to_string(),
				tree_path: "data".to_string(),
				target: "client".to_string(),
			};
			let store = Arc::new(VersionRepository::new(create_version_test_pool().await));
			let vcs = Arc::new(vcs);
			let exporter = Arc::new(exporter);
			let notifier = Arc::new(RecordingNotifier::default());
			let pipeline = Arc::new(IngestPipeline::new(
				settings,
				store.clone(),
				vcs.clone(),
				exporter.clone(),
				notifier.clone(),
			));

			Self {
				work,
				tools,
				store,
				vcs,
				exporter,
				notifier,
				pipeline,
			}
		}

		pub fn branches() -> BranchTable {
			BranchTable::new(BTreeMap::from([
				("main".to_string(), "svn://vcs/trunk".to_string()),
				("live".to_string(), "svn://vcs/branches/live".to_string()),
			]))
		}

		pub async fn job(&self, branch: &str, revision: &str) -> IngestJob {
			let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
			let url = format!("svn://vcs/{branch}");
			let new = self.pipeline.placeholder(branch, &url, revision, date);
			let record = self.store.insert(&new).await.unwrap();
			IngestJob {
				record,
				branch: branch.to_string(),
				url,
				revision: revision.to_string(),
			}
		}
	}

	#[tokio::test]
	async fn test_placeholder_fields() {
		let fx = Fixture::new(MockVcs::default(), MockExporter::reporting("")).await;
		let job = fx.job("main", "4821").await;

		assert_eq!(job.record.target, "client");
		assert_eq!(job.record.build_tag, "20240115_4821");
		assert_eq!(job.record.repo_root, "svn://vcs/main");
		assert_eq!(job.record.git_branch.as_deref(), Some("main"));
		assert_eq!(job.record.script_hash, "processing");
		assert_eq!(job.record.db_hash, "processing");
	}

	#[tokio::test]
	async fn test_success_patches_both_hashes_and_notifies_once() {
		let fx = Fixture::new(
			MockVcs::default(),
			MockExporter::reporting("SCRIPT_HASH=abc\nDB_HASH=def\n"),
		)
		.await;
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.run(&job).await;
		assert_eq!(result.outcome, JobOutcome::Succeeded);
		assert_eq!(result.record.script_hash, "abc");
		assert_eq!(result.record.db_hash, "def");

		let stored = fx.store.get_by_id(job.record.id).await.unwrap().unwrap();
		assert_eq!(stored.script_hash, "abc");
		assert_eq!(stored.db_hash, "def");

		let sent = fx.notifier.sent.lock().await;
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].script_hash, "abc");
	}

	#[tokio::test]
	async fn test_fresh_checkout_seeds_exporter_then_update_on_second_run() {
		let fx = Fixture::new(
			MockVcs::default(),
			MockExporter::reporting("SCRIPT_HASH=a\nDB_HASH=b\n"),
		)
		.await;

		let first = fx.job("main", "1").await;
		assert_eq!(fx.pipeline.fetch(&first).await.unwrap(), FetchKind::Checkout);
		let dir = fx.work.path().join("main");
		assert!(dir.join("hash_exporter").is_file());
		assert!(dir.join("hash_exporter.json").is_file());

		let second = fx.job("main", "2").await;
		assert_eq!(fx.pipeline.fetch(&second).await.unwrap(), FetchKind::Update);

		let calls = fx.vcs.calls.lock().await;
		assert_eq!(calls.len(), 2);
		assert_eq!(calls[0], ("checkout", dir.clone()));
		assert_eq!(calls[1], ("update", dir));
	}

	#[tokio::test]
	async fn test_failed_checkout_removes_directory_and_commits_error() {
		let vcs = MockVcs {
			fail_checkout: true,
			..Default::default()
		};
		let fx = Fixture::new(vcs, MockExporter::reporting("SCRIPT_HASH=a\nDB_HASH=b\n")).await;
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.run(&job).await;
		assert_eq!(result.outcome, JobOutcome::Failed);
		assert!(result.error.unwrap().contains("E170013"));
		assert!(!fx.work.path().join("main").exists());

		let stored = fx.store.get_by_id(job.record.id).await.unwrap().unwrap();
		assert_eq!(stored.script_hash, "error");
		assert_eq!(stored.db_hash, "error");
		assert_eq!(fx.notifier.sent.lock().await.len(), 1);
	}

	#[tokio::test]
	async fn test_missing_exporter_source_fails_fresh_fetch() {
		let fx = Fixture::new(MockVcs::default(), MockExporter::reporting("")).await;
		std::fs::remove_file(fx.tools.path().join("hash_exporter.json")).unwrap();
		let job = fx.job("live", "9").await;

		assert!(matches!(
			fx.pipeline.fetch(&job).await,
			Err(IngestError::Io(_))
		));
		assert!(!fx.work.path().join("live").exists());
		assert!(fx.vcs.calls.lock().await.is_empty());
	}

	#[tokio::test]
	async fn test_update_failure_commits_error() {
		let vcs = MockVcs {
			fail_update: true,
			..Default::default()
		};
		let fx = Fixture::new(vcs, MockExporter::reporting("SCRIPT_HASH=a\nDB_HASH=b\n")).await;
		std::fs::create_dir_all(fx.work.path().join("main")).unwrap();
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.run(&job).await;
		assert_eq!(result.outcome, JobOutcome::Failed);
		assert_eq!(result.record.script_hash, "error");
		assert!(fx.work.path().join("main").exists());
	}

	#[tokio::test]
	async fn test_exporter_failure_commits_error() {
		let fx = Fixture::new(MockVcs::default(), MockExporter::failing("pak missing")).await;
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.run(&job).await;
		assert_eq!(result.outcome, JobOutcome::Failed);
		let stored = fx.store.get_by_id(job.record.id).await.unwrap().unwrap();
		assert_eq!((stored.script_hash.as_str(), stored.db_hash.as_str()), ("error", "error"));
	}

	#[tokio::test]
	async fn test_partial_report_commits_error_for_both() {
		let fx = Fixture::new(MockVcs::default(), MockExporter::reporting("SCRIPT_HASH=abc\n")).await;
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.run(&job).await;
		assert_eq!(result.outcome, JobOutcome::Failed);
		assert!(result.error.unwrap().contains("DB_HASH"));
		assert_eq!(result.record.script_hash, "error");
		assert_eq!(result.record.db_hash, "error");
	}

	#[tokio::test]
	async fn test_empty_report_commits_unknown() {
		let fx = Fixture::new(MockVcs::default(), MockExporter::reporting("nothing to see\n")).await;
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.run(&job).await;
		assert_eq!(result.outcome, JobOutcome::Succeeded);
		assert_eq!(result.record.script_hash, "unknown");
		assert_eq!(result.record.db_hash, "unknown");
	}

	#[tokio::test]
	async fn test_abandon_commits_error_and_notifies() {
		let fx = Fixture::new(MockVcs::default(), MockExporter::reporting("")).await;
		let job = fx.job("main", "1").await;

		let result = fx.pipeline.abandon(&job).await;
		assert_eq!(result.outcome, JobOutcome::Abandoned);
		assert_eq!(result.record.db_hash, "error");
		assert_eq!(fx.notifier.sent.lock().await.len(), 1);
		assert!(fx.vcs.calls.lock().await.is_empty());
	}

	#[test]
	fn test_exporter_file_name() {
		let mut settings = IngestSettings::from_config(&IngestConfig::default()).unwrap();
		assert_eq!(settings.exporter_file_name(), "hash_exporter");
		settings.exporter_path = PathBuf::from("/opt/tools/export.exe");
		assert_eq!(settings.exporter_file_name(), "export.exe");
	}

	#[test]
	fn test_relative_config_paths_become_absolute() {
		let settings = IngestSettings::from_config(&IngestConfig::default()).unwrap();
		let cwd = std::env::current_dir().unwrap();

		assert!(settings.work_dir.is_absolute());
		assert!(settings.exporter_path.is_absolute());
		assert!(settings.exporter_config_path.is_absolute());
		assert!(settings.branch_dir("main").starts_with(&cwd));
		assert!(settings.branch_dir("main").ends_with("work/main"));
	}
}
