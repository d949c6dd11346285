// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
	Succeeded,
	Failed,
	/// Dequeued during shutdown without running.
	Abandoned,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct LastOutcome {
	pub version_id: i64,
	pub outcome: JobOutcome,
	pub finished_at: DateTime<Utc>,
	pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct BranchHealth {
	pub branch: String,
	pub status: HealthState,
	pub queued: usize,
	pub running: bool,
	pub completed: u64,
	pub failed: u64,
	pub last_outcome: Option<LastOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct IngestHealth {
	pub status: HealthState,
	pub accepting: bool,
	pub branches: Vec<BranchHealth>,
}

/// A branch is degraded while its most recent job did not succeed.
pub(crate) fn branch_state(last: Option<&LastOutcome>) -> HealthState {
	match last.map(|l| l.outcome) {
		None | Some(JobOutcome::Succeeded) => HealthState::Healthy,
		Some(JobOutcome::Failed) | Some(JobOutcome::Abandoned) => HealthState::Degraded,
	}
}

pub(crate) fn overall_state(accepting: bool, branches: &[BranchHealth]) -> HealthState {
	if !accepting {
		return HealthState::Unhealthy;
	}
	if branches.iter().any(|b| b.status != HealthState::Healthy) {
		HealthState::Degraded
	} else {
		HealthState::Healthy
	}
}
