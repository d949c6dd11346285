// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version-control client configuration.

use serde::Deserialize;
use vertrack_common_secret::SecretString;

const DEFAULT_PROGRAM: &str = "svn";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct VcsConfig {
	/// Command-line client to invoke.
	pub program: String,
	pub username: String,
	pub password: Option<SecretString>,
	/// Upper bound for a single checkout/update/export invocation.
	pub timeout_secs: u64,
}

impl Default for VcsConfig {
	fn default() -> Self {
		Self {
			program: DEFAULT_PROGRAM.to_string(),
			username: String::new(),
			password: None,
			timeout_secs: DEFAULT_TIMEOUT_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VcsConfigLayer {
	#[serde(default)]
	pub program: Option<String>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<SecretString>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl VcsConfigLayer {
	pub fn merge(&mut self, other: VcsConfigLayer) {
		if other.program.is_some() {
			self.program = other.program;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> VcsConfig {
		VcsConfig {
			program: self.program.unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
			username: self.username.unwrap_or_default(),
			password: self.password,
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = VcsConfigLayer::default().finalize();
		assert_eq!(config.program, "svn");
		assert!(config.username.is_empty());
		assert!(config.password.is_none());
		assert_eq!(config.timeout_secs, 600);
	}

	#[test]
	fn test_password_not_in_debug() {
		let config = VcsConfigLayer {
			password: Some(SecretString::from("hunter2")),
			..Default::default()
		}
		.finalize();
		assert!(!format!("{config:?}").contains("hunter2"));
	}
}
