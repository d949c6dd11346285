// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vertrack_common_secret::SecretString;
use vertrack_server_config::VcsConfig;

use crate::error::Result;
use crate::process::run_command;

/// What to fetch from a branch and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
	/// Branch source URL.
	pub url: String,
	/// Branch working directory.
	pub dir: PathBuf,
	/// Directory tree below `url`, checked out to `dir/<tree_path>`.
	pub tree_path: String,
	/// Single file below `url`, exported to `dir/<file name>`.
	pub artifact_path: String,
}

impl FetchPlan {
	pub fn tree_url(&self) -> String {
		join_url(&self.url, &self.tree_path)
	}

	pub fn artifact_url(&self) -> String {
		join_url(&self.url, &self.artifact_path)
	}

	pub fn tree_dir(&self) -> PathBuf {
		self.dir.join(&self.tree_path)
	}

	pub fn artifact_dest(&self) -> PathBuf {
		let name = Path::new(&self.artifact_path)
			.file_name()
			.map(PathBuf::from)
			.unwrap_or_else(|| PathBuf::from(&self.artifact_path));
		self.dir.join(name)
	}
}

fn join_url(base: &str, path: &str) -> String {
	format!(
		"{}/{}",
		base.trim_end_matches('/'),
		path.trim_start_matches('/')
	)
}

/// Version-control operations used by the pipeline.
#[async_trait]
pub trait VcsClient: Send + Sync {
	/// Populate a freshly created working directory.
	async fn checkout(&self, plan: &FetchPlan) -> Result<()>;

	/// Bring an existing working directory to the remote head, discarding local changes.
	async fn update(&self, plan: &FetchPlan) -> Result<()>;
}

/// [`VcsClient`] that shells out to a Subversion command-line client.
pub struct SvnCommandClient {
	program: PathBuf,
	username: String,
	password: Option<SecretString>,
	timeout: Duration,
}

impl SvnCommandClient {
	pub fn new(
		program: impl Into<PathBuf>,
		username: impl Into<String>,
		password: Option<SecretString>,
		timeout: Duration,
	) -> Self {
		Self {
			program: program.into(),
			username: username.into(),
			password,
			timeout,
		}
	}

	pub fn from_config(config: &VcsConfig) -> Self {
		Self::new(
			&config.program,
			&config.username,
			config.password.clone(),
			Duration::from_secs(config.timeout_secs),
		)
	}

	fn auth_args(&self) -> Vec<String> {
		let mut args = vec!["--non-interactive".to_string(), "--no-auth-cache".to_string()];
		if !self.username.is_empty() {
			args.push("--username".to_string());
			args.push(self.username.clone());
		}
		if let Some(password) = &self.password {
			args.push("--password".to_string());
			args.push(password.expose().clone());
		}
		args
	}

	async fn svn(&self, subcommand: &[&str], operands: &[String]) -> Result<String> {
		let mut args: Vec<String> = subcommand.iter().map(|s| s.to_string()).collect();
		args.extend(self.auth_args());
		args.extend(operands.iter().cloned());
		run_command(&self.program, &args, None, self.timeout).await
	}

	async fn export_artifact(&self, plan: &FetchPlan) -> Result<()> {
		self
			.svn(
				&["export", "--force"],
				&[
					plan.artifact_url(),
					plan.artifact_dest().display().to_string(),
				],
			)
			.await?;
		Ok(())
	}
}

#[async_trait]
impl VcsClient for SvnCommandClient {
	#[tracing::instrument(skip(self, plan), fields(url = %plan.url, dir = %plan.dir.display()))]
	async fn checkout(&self, plan: &FetchPlan) -> Result<()> {
		self
			.svn(
				&["checkout"],
				&[plan.tree_url(), plan.tree_dir().display().to_string()],
			)
			.await?;
		self.export_artifact(plan).await?;
		debug!("checkout complete");
		Ok(())
	}

	#[tracing::instrument(skip(self, plan), fields(url = %plan.url, dir = %plan.dir.display()))]
	async fn update(&self, plan: &FetchPlan) -> Result<()> {
		let tree_dir = plan.tree_dir().display().to_string();
		self.svn(&["revert", "-R"], &[tree_dir.clone()]).await?;
		self
			.svn(&["update", "--force", "--accept", "theirs-full"], &[tree_dir])
			.await?;
		self.export_artifact(plan).await?;
		debug!("update complete");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn plan(dir: &Path) -> FetchPlan {
		FetchPlan {
			url: "svn://vcs.example.com/game/trunk/".to_string(),
			dir: dir.to_path_buf(),
			tree_path: "data".to_string(),
			artifact_path: "bin/game.pak".to_string(),
		}
	}

	#[test]
	fn test_plan_paths() {
		let plan = plan(Path::new("/work/main"));
		assert_eq!(plan.tree_url(), "svn://vcs.example.com/game/trunk/data");
		assert_eq!(plan.artifact_url(), "svn://vcs.example.com/game/trunk/bin/game.pak");
		assert_eq!(plan.tree_dir(), PathBuf::from("/work/main/data"));
		assert_eq!(plan.artifact_dest(), PathBuf::from("/work/main/game.pak"));
	}

	#[test]
	fn test_auth_args() {
		let client = SvnCommandClient::new(
			"svn",
			"builder",
			Some(SecretString::new("pw".to_string())),
			Duration::from_secs(1),
		);
		assert_eq!(
			client.auth_args(),
			vec![
				"--non-interactive",
				"--no-auth-cache",
				"--username",
				"builder",
				"--password",
				"pw"
			]
		);

		let anonymous = SvnCommandClient::new("svn", "", None, Duration::from_secs(1));
		assert_eq!(anonymous.auth_args(), vec!["--non-interactive", "--no-auth-cache"]);
	}

	#[cfg(unix)]
	mod fake_svn {
		use super::*;
		use std::os::unix::fs::PermissionsExt;

		/// Writes a stand-in `svn` that appends its arguments to `calls.log`.
		fn install(dir: &Path) -> PathBuf {
			let script = dir.join("svn");
			let log = dir.join("calls.log");
			std::fs::write(
				&script,
				format!("#!/bin/sh\necho \"$@\" >> '{}'\n", log.display()),
			)
			.unwrap();
			std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
			script
		}

		fn calls(dir: &Path) -> Vec<String> {
			std::fs::read_to_string(dir.join("calls.log"))
				.unwrap()
				.lines()
				.map(str::to_string)
				.collect()
		}

		#[tokio::test]
		async fn test_checkout_and_update_commands() {
			let tools = tempfile::tempdir().unwrap();
			let work = tempfile::tempdir().unwrap();
			let client = SvnCommandClient::new(
				install(tools.path()),
				"builder",
				Some(SecretString::new("pw".to_string())),
				Duration::from_secs(10),
			);
			let plan = plan(work.path());
			let auth = "--non-interactive --no-auth-cache --username builder --password pw";
			let tree = work.path().join("data").display().to_string();
			let pak = work.path().join("game.pak").display().to_string();

			client.checkout(&plan).await.unwrap();
			client.update(&plan).await.unwrap();

			assert_eq!(
				calls(tools.path()),
				vec![
					format!("checkout {auth} svn://vcs.example.com/game/trunk/data {tree}"),
					format!("export --force {auth} svn://vcs.example.com/game/trunk/bin/game.pak {pak}"),
					format!("revert -R {auth} {tree}"),
					format!("update --force --accept theirs-full {auth} {tree}"),
					format!("export --force {auth} svn://vcs.example.com/game/trunk/bin/game.pak {pak}"),
				]
			);
		}

		#[tokio::test]
		async fn test_failure_surfaces_without_password() {
			let tools = tempfile::tempdir().unwrap();
			let script = tools.path().join("svn");
			std::fs::write(&script, "#!/bin/sh\necho 'E170013: unable to connect' >&2\nexit 1\n")
				.unwrap();
			std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

			let client = SvnCommandClient::new(
				script,
				"builder",
				Some(SecretString::new("hunter2".to_string())),
				Duration::from_secs(10),
			);
			let err = client
				.checkout(&plan(tools.path()))
				.await
				.unwrap_err()
				.to_string();
			assert!(err.contains("E170013"));
			assert!(!err.contains("hunter2"));
		}
	}
}
