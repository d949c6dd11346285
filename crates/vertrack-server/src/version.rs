// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for vertrack-server.

pub const SERVICE_NAME: &str = "vertrack-server";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn platform() -> String {
	format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Format version info for display.
pub fn format_version_info() -> String {
	format!(
		"{SERVICE_NAME} version: {VERSION}\n\
		 Platform:                {}",
		platform()
	)
}
