// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build-ingest pipeline.
//!
//! A trigger names a configured branch and a revision. The service writes a
//! placeholder record with `processing` hashes and hands the job to that
//! branch's worker, which fetches the build into the branch working
//! directory, runs the hash exporter and patches the record with the result.
//! Jobs for one branch run one at a time; branches run in parallel.

pub mod branch;
pub mod error;
pub mod exporter;
pub mod health;
pub mod pipeline;
mod process;
pub mod queue;
pub mod report;
pub mod service;
pub mod vcs;

pub use branch::{derive_build_tag, validate_revision, BranchTable, MAX_REVISION_LEN};
pub use error::{IngestError, Result};
pub use exporter::{CommandExporter, Exporter};
pub use health::{BranchHealth, HealthState, IngestHealth, JobOutcome, LastOutcome};
pub use pipeline::{FetchKind, IngestJob, IngestPipeline, IngestSettings};
pub use queue::IngestQueue;
pub use report::{parse_report, HashReport, DB_HASH_KEY, SCRIPT_HASH_KEY};
pub use service::IngestService;
pub use vcs::{FetchPlan, SvnCommandClient, VcsClient};
