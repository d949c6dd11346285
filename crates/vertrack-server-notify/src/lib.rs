// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chat webhook notifications for stored build versions.
//!
//! Delivery is best-effort: a [`Notifier`] reports success as a boolean and
//! logs failures, it never returns an error to the caller.

mod error;
mod message;
mod webhook;

pub use error::NotifyError;
pub use message::{format_message, UNKNOWN};
pub use webhook::{NoopNotifier, Notifier, WebhookNotifier};
