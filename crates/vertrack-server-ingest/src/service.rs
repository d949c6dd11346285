// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use vertrack_server_db::{VersionRecord, VersionStore};

use crate::branch::{validate_revision, BranchTable};
use crate::error::Result;
use crate::health::IngestHealth;
use crate::pipeline::{IngestJob, IngestPipeline};
use crate::queue::IngestQueue;

/// Entry point for ingest triggers.
pub struct IngestService {
	branches: BranchTable,
	queue: IngestQueue,
	pipeline: Arc<IngestPipeline>,
}

impl IngestService {
	/// Start one worker per configured branch.
	pub fn start(branches: BranchTable, queue_capacity: usize, pipeline: Arc<IngestPipeline>) -> Self {
		let queue = IngestQueue::start(
			branches.names().map(str::to_string).collect::<Vec<_>>(),
			queue_capacity,
			Arc::clone(&pipeline),
		);
		Self {
			branches,
			queue,
			pipeline,
		}
	}

	pub fn branches(&self) -> &BranchTable {
		&self.branches
	}

	/// Validate the trigger, write the placeholder record and queue the job.
	///
	/// Returns the placeholder. Nothing is written when validation fails or
	/// the branch queue is full.
	#[instrument(skip(self))]
	pub async fn trigger(&self, branch: &str, revision: &str) -> Result<VersionRecord> {
		let url = self.branches.resolve(branch)?;
		let revision = validate_revision(revision)?;
		let slot = self.queue.reserve(branch)?;

		let new = self
			.pipeline
			.placeholder(branch, url, revision, Utc::now().date_naive());
		let record = self.pipeline.store().insert(&new).await?;

		slot.submit(IngestJob {
			record: record.clone(),
			branch: branch.to_string(),
			url: url.to_string(),
			revision: revision.to_string(),
		});

		info!(version_id = record.id, build_tag = %record.build_tag, "ingest queued");
		Ok(record)
	}

	pub async fn health(&self) -> IngestHealth {
		self.queue.status().await
	}

	pub async fn shutdown(&self) {
		self.queue.shutdown().await;
	}
}
