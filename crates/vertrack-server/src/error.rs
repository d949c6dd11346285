// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use vertrack_server_db::DbError;
use vertrack_server_ingest::IngestError;

pub use vertrack_server_api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("bad request: {0}")]
	BadRequest(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("service unavailable: {0}")]
	ServiceUnavailable(String),

	#[error("internal error: {0}")]
	Internal(String),

	#[error("database error: {0}")]
	Db(DbError),
}

impl From<DbError> for ServerError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::NotFound(what) => ServerError::NotFound(what),
			other => ServerError::Db(other),
		}
	}
}

impl From<IngestError> for ServerError {
	fn from(e: IngestError) -> Self {
		match e {
			IngestError::UnknownBranch(_) | IngestError::InvalidRevision(_) => {
				ServerError::BadRequest(e.to_string())
			}
			IngestError::QueueFull(_) | IngestError::ShuttingDown => {
				ServerError::ServiceUnavailable(e.to_string())
			}
			IngestError::Db(db) => db.into(),
			other => ServerError::Internal(other.to_string()),
		}
	}
}

impl ServerError {
	fn status_and_code(&self) -> (StatusCode, &'static str) {
		match self {
			ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
			ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
			ServerError::ServiceUnavailable(_) => {
				(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
			}
			ServerError::Internal(_) | ServerError::Db(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
			}
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, code) = self.status_and_code();
		let message = match &self {
			ServerError::BadRequest(m)
			| ServerError::NotFound(m)
			| ServerError::ServiceUnavailable(m) => m.clone(),
			ServerError::Internal(_) | ServerError::Db(_) => {
				tracing::error!(error = %self, "request failed");
				"internal server error".to_string()
			}
		};

		(
			status,
			Json(ErrorResponse {
				error: code.to_string(),
				message,
			}),
		)
			.into_response()
	}
}
