// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::process::run_command;

/// Runs the hash exporter inside a branch working directory.
#[async_trait]
pub trait Exporter: Send + Sync {
	/// Returns the exporter's stdout.
	async fn run(&self, work_dir: &Path) -> Result<String>;
}

/// [`Exporter`] that executes the copy of the exporter placed in the working directory.
pub struct CommandExporter {
	file_name: String,
	args: Vec<String>,
	timeout: Duration,
}

impl CommandExporter {
	pub fn new(file_name: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
		Self {
			file_name: file_name.into(),
			args,
			timeout,
		}
	}
}

#[async_trait]
impl Exporter for CommandExporter {
	#[tracing::instrument(skip(self), fields(exporter = %self.file_name, work_dir = %work_dir.display()))]
	async fn run(&self, work_dir: &Path) -> Result<String> {
		// Resolved by the child after it enters `work_dir`.
		let program = Path::new(".").join(&self.file_name);
		run_command(&program, &self.args, Some(work_dir), self.timeout).await
	}
}
