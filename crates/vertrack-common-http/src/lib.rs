// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client for vertrack.
//!
//! Every outbound request carries the same User-Agent so webhook receivers can
//! tell the service apart from ad-hoc scripts.

mod client;

pub use client::{builder, new_client_with_timeout, user_agent};
