// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod database;
mod http;
mod ingest;
mod logging;
mod notify;
mod vcs;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use ingest::{is_valid_branch_name, IngestConfig, IngestConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use notify::{NotifyConfig, NotifyConfigLayer};
pub use vcs::{VcsConfig, VcsConfigLayer};
