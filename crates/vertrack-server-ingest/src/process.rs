// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{trace, warn};
use vertrack_common_secret::REDACTED;

use crate::error::{IngestError, Result};

const SECRET_FLAGS: [&str; 1] = ["--password"];

/// Argument list safe to log: values following secret flags are replaced.
pub(crate) fn redact_args(args: &[String]) -> Vec<String> {
	let mut redacted = Vec::with_capacity(args.len());
	let mut hide_next = false;
	for arg in args {
		if hide_next {
			redacted.push(REDACTED.to_string());
			hide_next = false;
			continue;
		}
		hide_next = SECRET_FLAGS.contains(&arg.as_str());
		redacted.push(arg.clone());
	}
	redacted
}

/// Run a program to completion and return its stdout.
///
/// The child is killed if `timeout` elapses first. A non-zero exit status is
/// an error carrying the trimmed stderr.
pub(crate) async fn run_command(
	program: &Path,
	args: &[String],
	cwd: Option<&Path>,
	timeout: Duration,
) -> Result<String> {
	let program_name = program.display().to_string();
	let shown_args = redact_args(args).join(" ");

	let mut cmd = Command::new(program);
	cmd.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);
	if let Some(cwd) = cwd {
		cmd.current_dir(cwd);
	}

	trace!(cmd = %format!("{program_name} {shown_args}"), "running command");

	let output = match tokio::time::timeout(timeout, cmd.output()).await {
		Ok(result) => result.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				warn!(program = %program_name, "program not found");
				IngestError::ProgramNotFound {
					program: program_name.clone(),
				}
			} else {
				IngestError::Io(e)
			}
		})?,
		Err(_) => {
			warn!(program = %program_name, timeout_secs = timeout.as_secs(), "command timed out");
			return Err(IngestError::Timeout {
				program: program_name,
				secs: timeout.as_secs(),
			});
		}
	};

	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	} else {
		Err(IngestError::CommandFailed {
			program: program_name,
			args: shown_args,
			status: output.status.to_string(),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		})
	}
}
