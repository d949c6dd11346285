// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
	#[error("unknown branch: {0}")]
	UnknownBranch(String),

	#[error("invalid revision: {0}")]
	InvalidRevision(String),

	#[error("ingest queue for branch '{0}' is full")]
	QueueFull(String),

	#[error("ingest queue is shutting down")]
	ShuttingDown,

	#[error("{program} not found")]
	ProgramNotFound { program: String },

	#[error("{program} timed out after {secs}s")]
	Timeout { program: String, secs: u64 },

	#[error("{program} {args} exited with {status}: {stderr}")]
	CommandFailed {
		program: String,
		args: String,
		status: String,
		stderr: String,
	},

	#[error("exporter report is missing {0}")]
	PartialReport(&'static str),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("db error: {0}")]
	Db(#[from] vertrack_server_db::DbError),
}
