// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use vertrack_common_secret::SecretString;
use vertrack_server_db::VersionRecord;

use crate::error::NotifyError;
use crate::message::format_message;

/// Announces a persisted version record.
#[async_trait]
pub trait Notifier: Send + Sync {
	/// Returns `true` when the announcement was accepted.
	async fn notify(&self, record: &VersionRecord) -> bool;
}

/// Posts `{"text": ...}` to a chat webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
	client: Client,
	webhook_url: Option<SecretString>,
}

impl WebhookNotifier {
	pub fn new(webhook_url: Option<SecretString>, timeout: Duration) -> Result<Self, NotifyError> {
		let client = vertrack_common_http::new_client_with_timeout(timeout)?;
		Ok(Self {
			client,
			webhook_url,
		})
	}

	pub fn with_client(client: Client, webhook_url: Option<SecretString>) -> Self {
		Self {
			client,
			webhook_url,
		}
	}

	pub fn is_configured(&self) -> bool {
		self.webhook_url.is_some()
	}

	/// Send one message. No retries.
	pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
		let url = self.webhook_url.as_ref().ok_or(NotifyError::NotConfigured)?;

		let response = self
			.client
			.post(url.expose().as_str())
			.json(&serde_json::json!({ "text": text }))
			.send()
			.await
			.map_err(|e| NotifyError::Transport(e.without_url()))?;

		let status = response.status();
		if status.is_success() {
			return Ok(());
		}

		let body = response.text().await.unwrap_or_default();
		Err(NotifyError::Status {
			status: status.as_u16(),
			body,
		})
	}
}

#[async_trait]
impl Notifier for WebhookNotifier {
	#[tracing::instrument(skip(self, record), fields(version_id = record.id))]
	async fn notify(&self, record: &VersionRecord) -> bool {
		let message = format_message(record);
		match self.send(&message).await {
			Ok(()) => {
				tracing::info!("webhook notification sent");
				true
			}
			Err(NotifyError::NotConfigured) => {
				tracing::warn!("webhook URL not configured, skipping notification");
				false
			}
			Err(NotifyError::Status { status, body }) => {
				tracing::error!(status, body = %body, "webhook rejected notification");
				false
			}
			Err(e) => {
				tracing::error!(error = %e, "webhook notification failed");
				false
			}
		}
	}
}

/// Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
	async fn notify(&self, record: &VersionRecord) -> bool {
		tracing::debug!(version_id = record.id, "notifications disabled");
		false
	}
}
