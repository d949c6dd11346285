// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chat webhook notification configuration.

use serde::Deserialize;
use vertrack_common_secret::SecretString;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Webhook settings. The URL embeds the channel token, so it is a secret.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
	pub webhook_url: Option<SecretString>,
	pub timeout_secs: u64,
}

impl Default for NotifyConfig {
	fn default() -> Self {
		Self {
			webhook_url: None,
			timeout_secs: DEFAULT_TIMEOUT_SECS,
		}
	}
}

impl NotifyConfig {
	pub fn is_configured(&self) -> bool {
		self.webhook_url.is_some()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfigLayer {
	#[serde(default)]
	pub webhook_url: Option<SecretString>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl NotifyConfigLayer {
	pub fn merge(&mut self, other: NotifyConfigLayer) {
		if other.webhook_url.is_some() {
			self.webhook_url = other.webhook_url;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> NotifyConfig {
		NotifyConfig {
			webhook_url: self.webhook_url.filter(|u| !u.expose().trim().is_empty()),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_blank_url_is_unconfigured() {
		let config = NotifyConfigLayer {
			webhook_url: Some(SecretString::from("   ")),
			timeout_secs: None,
		}
		.finalize();
		assert!(!config.is_configured());
		assert_eq!(config.timeout_secs, 30);
	}

	#[test]
	fn test_url_is_kept() {
		let config = NotifyConfigLayer {
			webhook_url: Some(SecretString::from("https://hooks.example.com/x")),
			timeout_secs: Some(5),
		}
		.finalize();
		assert!(config.is_configured());
		assert_eq!(config.timeout_secs, 5);
	}
}
