// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use vertrack_server_db::VersionRecord;

/// Rendered in place of a missing or blank field.
pub const UNKNOWN: &str = "unknown";

fn or_unknown(value: Option<&str>) -> &str {
	match value.map(str::trim) {
		Some(v) if !v.is_empty() => v,
		_ => UNKNOWN,
	}
}

/// Render the chat message announcing a version record.
pub fn format_message(record: &VersionRecord) -> String {
	format!(
		":video_game: *build hash info*\n\
		 • build: {}\n\
		 • target: {}\n\
		 • branch: {}\n\
		 • build tag: {}\n\
		 • script hash: *{}*\n\
		 • db hash: *{}*",
		or_unknown(Some(&record.repo_root)),
		or_unknown(Some(&record.target)),
		or_unknown(record.git_branch.as_deref()),
		or_unknown(Some(&record.build_tag)),
		or_unknown(Some(&record.script_hash)),
		or_unknown(Some(&record.db_hash)),
	)
}
