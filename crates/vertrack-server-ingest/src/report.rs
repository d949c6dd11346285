// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use vertrack_server_db::HashSentinel;

pub const SCRIPT_HASH_KEY: &str = "SCRIPT_HASH";
pub const DB_HASH_KEY: &str = "DB_HASH";

const RECOGNIZED_KEYS: [&str; 2] = [SCRIPT_HASH_KEY, DB_HASH_KEY];

/// Parse exporter stdout.
///
/// Each line of the form `KEY=VALUE` with a recognized key contributes one
/// entry; surrounding whitespace is ignored, blank values are dropped and the
/// first occurrence of a key wins. Every other line is ignored.
pub fn parse_report(stdout: &str) -> BTreeMap<&'static str, String> {
	let mut found = BTreeMap::new();
	for line in stdout.lines() {
		let Some((key, value)) = line.split_once('=') else {
			continue;
		};
		let Some(key) = RECOGNIZED_KEYS.iter().find(|k| **k == key.trim()) else {
			continue;
		};
		let value = value.trim();
		if value.is_empty() {
			continue;
		}
		found.entry(*key).or_insert_with(|| value.to_string());
	}
	found
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashReport {
	pub script_hash: String,
	pub db_hash: String,
	/// Recognized keys absent from the output.
	pub missing: Vec<&'static str>,
}

impl HashReport {
	/// Missing keys default to `unknown`.
	pub fn from_output(stdout: &str) -> Self {
		let mut found = parse_report(stdout);
		let mut take = |key: &'static str, missing: &mut Vec<&'static str>| {
			found.remove(key).unwrap_or_else(|| {
				missing.push(key);
				HashSentinel::Unknown.as_str().to_string()
			})
		};

		let mut missing = Vec::new();
		let script_hash = take(SCRIPT_HASH_KEY, &mut missing);
		let db_hash = take(DB_HASH_KEY, &mut missing);
		Self {
			script_hash,
			db_hash,
			missing,
		}
	}

	/// Exactly one of the two hashes was reported.
	pub fn is_partial(&self) -> bool {
		self.missing.len() == 1
	}
}
