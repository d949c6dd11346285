// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for `POST /api/versions/cdn`.
//!
//! The version control client and the hash exporter are replaced with
//! in-process fakes so the full trigger-to-settled flow runs through the router.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
	body::Body,
	http::{Request, StatusCode},
	Router,
};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tokio::sync::Mutex;
use tower::ServiceExt;
use vertrack_server::{create_router, AppState};
use vertrack_server_db::{VersionRecord, VersionRepository, VersionStore};
use vertrack_server_ingest::{
	BranchTable, Exporter, FetchPlan, IngestError, IngestPipeline, IngestService, IngestSettings,
	VcsClient,
};
use vertrack_server_notify::Notifier;

struct FakeVcs;

#[async_trait]
impl VcsClient for FakeVcs {
	async fn checkout(&self, plan: &FetchPlan) -> vertrack_server_ingest::Result<()> {
		tokio::fs::create_dir_all(plan.tree_dir()).await?;
		Ok(())
	}

	async fn update(&self, _plan: &FetchPlan) -> vertrack_server_ingest::Result<()> {
		Ok(())
	}
}

struct FakeExporter {
	stdout: Option<String>,
}

#[async_trait]
impl Exporter for FakeExporter {
	async fn run(&self, _work_dir: &Path) -> vertrack_server_ingest::Result<String> {
		tokio::time::sleep(Duration::from_millis(20)).await;
		self.stdout.clone().ok_or_else(|| IngestError::CommandFailed {
			program: "hash_exporter".to_string(),
			args: String::new(),
			status: "exit status: 1".to_string(),
			stderr: "pak file is corrupt".to_string(),
		})
	}
}

#[derive(Default)]
struct RecordingNotifier {
	sent: Mutex<Vec<VersionRecord>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn notify(&self, record: &VersionRecord) -> bool {
		self.sent.lock().await.push(record.clone());
		true
	}
}

struct TestApp {
	router: Router,
	state: AppState,
	notifier: Arc<RecordingNotifier>,
	_dirs: Vec<TempDir>,
}

async fn setup_test_app(exporter_stdout: Option<&str>) -> TestApp {
	let db_dir = tempdir().unwrap();
	let work = tempdir().unwrap();
	let tools = tempdir().unwrap();
	std::fs::write(tools.path().join("hash_exporter"), "#!/bin/sh\n").unwrap();
	std::fs::write(tools.path().join("hash_exporter.json"), "{}").unwrap();

	let db_url = format!("sqlite:{}?mode=rwc", db_dir.path().join("ingest.db").display());
	let pool = vertrack_server_db::create_pool(&db_url).await.unwrap();
	vertrack_server_db::run_migrations(&pool).await.unwrap();

	let store: Arc<dyn VersionStore> = Arc::new(VersionRepository::new(pool.clone()));
	let notifier = Arc::new(RecordingNotifier::default());
	let settings = IngestSettings {
		work_dir: work.path().to_path_buf(),
		exporter_path: tools.path().join("hash_exporter"),
		exporter_config_path: tools.path().join("hash_exporter.json"),
		artifact_path: "bin/game.pak".to_string(),
		tree_path: "data".to_string(),
		target: "client".to_string(),
	};
	let pipeline = Arc::new(IngestPipeline::new(
		settings,
		store.clone(),
		Arc::new(FakeVcs),
		Arc::new(FakeExporter {
			stdout: exporter_stdout.map(str::to_string),
		}),
		notifier.clone(),
	));
	let branches = BranchTable::new(BTreeMap::from([(
		"main".to_string(),
		"svn://vcs.example/game/trunk".to_string(),
	)]));
	let ingest = Arc::new(IngestService::start(branches, 4, pipeline));

	let state = AppState {
		pool,
		store,
		notifier: notifier.clone(),
		ingest,
	};

	TestApp {
		router: create_router(state.clone()),
		state,
		notifier,
		_dirs: vec![db_dir, work, tools],
	}
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	(status, serde_json::from_slice(&body).unwrap())
}

fn trigger(query: &str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(format!("/api/versions/cdn?{query}"))
		.body(Body::empty())
		.unwrap()
}

async fn wait_for_settled(store: &Arc<dyn VersionStore>, id: i64) -> VersionRecord {
	for _ in 0..200 {
		let record = store.get_by_id(id).await.unwrap().unwrap();
		if !record.is_processing() {
			return record;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("version {id} never left processing");
}

async fn wait_for_notifications(notifier: &RecordingNotifier, expected: usize) -> Vec<VersionRecord> {
	for _ in 0..200 {
		let sent = notifier.sent.lock().await.clone();
		if sent.len() >= expected {
			return sent;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("expected {expected} notifications");
}

async fn wait_for_health(app: &Router, status: &str) -> Value {
	let mut last = Value::Null;
	for _ in 0..200 {
		let (_, health) = send(
			app,
			Request::builder().uri("/health").body(Body::empty()).unwrap(),
		)
		.await;
		if health["status"] == status {
			return health;
		}
		last = health;
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("health never became {status}: {last}");
}

#[tokio::test]
async fn test_trigger_returns_placeholder_then_records_hashes() {
	let app = setup_test_app(Some("SCRIPT_HASH=abc123\nDB_HASH=def456\n")).await;

	let (status, placeholder) = send(&app.router, trigger("branch=main&revision=1234")).await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(placeholder["target"], "client");
	assert_eq!(placeholder["git_branch"], "main");
	assert_eq!(placeholder["script_hash"], "processing");
	assert_eq!(placeholder["db_hash"], "processing");
	assert!(placeholder["build_tag"].as_str().unwrap().ends_with("_1234"));

	let id = placeholder["id"].as_i64().unwrap();
	let settled = wait_for_settled(&app.state.store, id).await;
	assert_eq!(settled.script_hash, "abc123");
	assert_eq!(settled.db_hash, "def456");

	let sent = wait_for_notifications(&app.notifier, 1).await;
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].id, id);
	assert_eq!(sent[0].script_hash, "abc123");
}

#[tokio::test]
async fn test_failed_export_marks_record_error() {
	let app = setup_test_app(None).await;

	let (status, placeholder) = send(&app.router, trigger("branch=main&revision=77")).await;
	assert_eq!(status, StatusCode::CREATED);

	let id = placeholder["id"].as_i64().unwrap();
	let settled = wait_for_settled(&app.state.store, id).await;
	assert_eq!(settled.script_hash, "error");
	assert_eq!(settled.db_hash, "error");
	assert_eq!(wait_for_notifications(&app.notifier, 1).await.len(), 1);

	let health = wait_for_health(&app.router, "degraded").await;
	assert_eq!(health["components"]["ingest"]["branches"][0]["failed"], 1);
}

#[tokio::test]
async fn test_partial_report_marks_record_error() {
	let app = setup_test_app(Some("SCRIPT_HASH=abc123\n")).await;

	let (_, placeholder) = send(&app.router, trigger("branch=main&revision=78")).await;
	let id = placeholder["id"].as_i64().unwrap();
	let settled = wait_for_settled(&app.state.store, id).await;
	assert_eq!(settled.script_hash, "error");
	assert_eq!(settled.db_hash, "error");
}

#[tokio::test]
async fn test_invalid_trigger_writes_nothing() {
	let app = setup_test_app(Some("SCRIPT_HASH=a\nDB_HASH=b\n")).await;

	let (status, body) = send(&app.router, trigger("branch=live&revision=1")).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(body["message"].as_str().unwrap().contains("live"));

	let (status, _) = send(&app.router, trigger("branch=main&revision=..%2F..%2Fetc")).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (_, total) = app.state.store.list_page(0, 10).await.unwrap();
	assert_eq!(total, 0);
}

#[tokio::test]
async fn test_trigger_after_shutdown_is_unavailable() {
	let app = setup_test_app(Some("SCRIPT_HASH=a\nDB_HASH=b\n")).await;
	app.state.ingest.shutdown().await;

	let (status, body) = send(&app.router, trigger("branch=main&revision=5")).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(body["error"], "service_unavailable");

	let (_, total) = app.state.store.list_page(0, 10).await.unwrap();
	assert_eq!(total, 0);
}
