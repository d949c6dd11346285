// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
	#[error("webhook URL is not configured")]
	NotConfigured,

	/// Request errors from `send` have the URL stripped; it carries the channel token.
	#[error("webhook request failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("webhook returned {status}: {body}")]
	Status { status: u16, body: String },
}
