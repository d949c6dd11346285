// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration merged from every source.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, HttpConfigLayer, IngestConfigLayer, LoggingConfigLayer, NotifyConfigLayer,
	VcsConfigLayer,
};

/// One source's view of the configuration. Every field is optional so later
/// sources only override what they actually set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub notify: Option<NotifyConfigLayer>,
	#[serde(default)]
	pub vcs: Option<VcsConfigLayer>,
	#[serde(default)]
	pub ingest: Option<IngestConfigLayer>,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		if let Some(http) = other.http {
			self.http.get_or_insert_with(Default::default).merge(http);
		}
		if let Some(database) = other.database {
			self
				.database
				.get_or_insert_with(Default::default)
				.merge(database);
		}
		if let Some(logging) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(logging);
		}
		if let Some(notify) = other.notify {
			self.notify.get_or_insert_with(Default::default).merge(notify);
		}
		if let Some(vcs) = other.vcs {
			self.vcs.get_or_insert_with(Default::default).merge(vcs);
		}
		if let Some(ingest) = other.ingest {
			self.ingest.get_or_insert_with(Default::default).merge(ingest);
		}
	}
}
