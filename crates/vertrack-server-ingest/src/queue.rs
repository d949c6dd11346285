// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::error::{IngestError, Result};
use crate::health::{branch_state, overall_state, BranchHealth, IngestHealth, JobOutcome, LastOutcome};
use crate::pipeline::{IngestJob, IngestPipeline, JobResult};

#[derive(Default)]
struct BranchStats {
	queued: AtomicUsize,
	running: AtomicBool,
	completed: AtomicU64,
	failed: AtomicU64,
	last: Mutex<Option<LastOutcome>>,
}

impl BranchStats {
	async fn record(&self, result: &JobResult) {
		match result.outcome {
			JobOutcome::Succeeded => self.completed.fetch_add(1, Ordering::SeqCst),
			JobOutcome::Failed | JobOutcome::Abandoned => self.failed.fetch_add(1, Ordering::SeqCst),
		};
		*self.last.lock().await = Some(LastOutcome {
			version_id: result.record.id,
			outcome: result.outcome,
			finished_at: Utc::now(),
			error: result.error.clone(),
		});
	}
}

struct BranchWorker {
	sender: mpsc::Sender<IngestJob>,
	stats: Arc<BranchStats>,
}

/// A reserved place in a branch queue. Dropping it releases the place.
pub struct QueueSlot<'a> {
	permit: mpsc::Permit<'a, IngestJob>,
	stats: &'a BranchStats,
}

impl QueueSlot<'_> {
	pub fn submit(self, job: IngestJob) {
		self.stats.queued.fetch_add(1, Ordering::SeqCst);
		self.permit.send(job);
	}
}

/// One bounded queue and one worker task per branch.
pub struct IngestQueue {
	workers: BTreeMap<String, BranchWorker>,
	accepting: AtomicBool,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl IngestQueue {
	/// Spawn the branch workers. Must be called inside a tokio runtime.
	pub fn start<I, S>(branches: I, capacity: usize, pipeline: Arc<IngestPipeline>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let (shutdown_tx, _) = broadcast::channel(1);
		let mut workers = BTreeMap::new();
		let mut handles = Vec::new();

		for branch in branches {
			let branch = branch.into();
			let (sender, receiver) = mpsc::channel(capacity.max(1));
			let stats = Arc::new(BranchStats::default());

			handles.push(tokio::spawn(run_worker(
				branch.clone(),
				receiver,
				Arc::clone(&stats),
				Arc::clone(&pipeline),
				shutdown_tx.subscribe(),
			)));
			workers.insert(branch, BranchWorker { sender, stats });
		}

		info!(branch_count = workers.len(), capacity, "Ingest queue started");
		Self {
			workers,
			accepting: AtomicBool::new(true),
			shutdown_tx,
			handles: Mutex::new(handles),
		}
	}

	pub fn is_accepting(&self) -> bool {
		self.accepting.load(Ordering::SeqCst)
	}

	/// Reserve a place in `branch`'s queue without waiting.
	pub fn reserve(&self, branch: &str) -> Result<QueueSlot<'_>> {
		if !self.is_accepting() {
			return Err(IngestError::ShuttingDown);
		}
		let worker = self
			.workers
			.get(branch)
			.ok_or_else(|| IngestError::UnknownBranch(branch.to_string()))?;

		match worker.sender.try_reserve() {
			Ok(permit) => Ok(QueueSlot {
				permit,
				stats: &worker.stats,
			}),
			Err(TrySendError::Full(())) => Err(IngestError::QueueFull(branch.to_string())),
			Err(TrySendError::Closed(())) => Err(IngestError::ShuttingDown),
		}
	}

	pub async fn status(&self) -> IngestHealth {
		let mut branches = Vec::with_capacity(self.workers.len());
		for (name, worker) in &self.workers {
			let stats = &worker.stats;
			let last = stats.last.lock().await.clone();
			branches.push(BranchHealth {
				branch: name.clone(),
				status: branch_state(last.as_ref()),
				queued: stats.queued.load(Ordering::SeqCst),
				running: stats.running.load(Ordering::SeqCst),
				completed: stats.completed.load(Ordering::SeqCst),
				failed: stats.failed.load(Ordering::SeqCst),
				last_outcome: last,
			});
		}

		let accepting = self.is_accepting();
		IngestHealth {
			status: overall_state(accepting, &branches),
			accepting,
			branches,
		}
	}

	/// Stop accepting jobs and wait for every worker to settle its queue.
	///
	/// Returns the number of workers that had died. Their queued records may
	/// still read `processing` until the next startup marks them `error`.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) -> usize {
		self.accepting.store(false, Ordering::SeqCst);
		let _ = self.shutdown_tx.send(());

		let mut crashed = 0;
		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			if let Err(e) = handle.await {
				error!(error = %e, "Ingest worker terminated abnormally");
				crashed += 1;
			}
		}

		info!(crashed, "Ingest queue shut down");
		crashed
	}
}

async fn run_worker(
	branch: String,
	mut receiver: mpsc::Receiver<IngestJob>,
	stats: Arc<BranchStats>,
	pipeline: Arc<IngestPipeline>,
	mut shutdown_rx: broadcast::Receiver<()>,
) {
	loop {
		let job = tokio::select! {
			biased;
			_ = shutdown_rx.recv() => break,
			job = receiver.recv() => match job {
				Some(job) => job,
				None => break,
			},
		};

		stats.queued.fetch_sub(1, Ordering::SeqCst);
		stats.running.store(true, Ordering::SeqCst);
		let result = pipeline.run(&job).await;
		stats.running.store(false, Ordering::SeqCst);
		stats.record(&result).await;
	}

	receiver.close();
	let mut abandoned = 0usize;
	while let Some(job) = receiver.recv().await {
		stats.queued.fetch_sub(1, Ordering::SeqCst);
		let result = pipeline.abandon(&job).await;
		stats.record(&result).await;
		abandoned += 1;
	}

	info!(branch = %branch, abandoned, "Ingest worker stopped");
}
