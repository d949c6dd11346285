// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! vertrack build version tracking server.
//!
//! This crate provides an HTTP server that records build versions in a
//! SQLite database, ingests client builds from version control and
//! announces new versions to a chat webhook.

pub mod api;
pub mod api_docs;
pub mod error;
pub mod health;
pub mod routes;
pub mod validation;
pub mod version;

pub use api::{create_app_state, create_router, AppState};
pub use api_docs::ApiDoc;
pub use error::ServerError;
pub use vertrack_server_config::ServerConfig;
