// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the vertrack server.
//!
//! Owns the SQLite pool, the `versions` schema and the [`VersionStore`]
//! repository used by the HTTP handlers and the ingest pipeline.

pub mod error;
pub mod pool;
pub mod testing;
pub mod version;

pub use error::{DbError, Result};
pub use pool::{create_pool, create_pool_with_settings, ping, run_migrations, PoolSettings};
pub use version::{
	BranchFilter, HashSentinel, NewVersion, VersionPatch, VersionRecord, VersionRepository,
	VersionStore,
};
