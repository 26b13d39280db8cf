// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use guild_server_api::ErrorResponse;
use guild_server_auth::AuthProviderError;
use guild_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Auth provider error: {0}")]
	AuthProvider(#[from] AuthProviderError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	/// Invalid request payload.
	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Internal error: {0}")]
	Internal(String),

	/// Database or another dependency is unreachable.
	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),
}

impl ServerError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			ServerError::Db(DbError::NotFound(_)) | ServerError::NotFound(_) => StatusCode::NOT_FOUND,
			ServerError::Db(DbError::Conflict(_)) | ServerError::Conflict(_) => StatusCode::CONFLICT,
			ServerError::Db(DbError::Forbidden(_)) | ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
			ServerError::Db(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
			ServerError::AuthProvider(e) if e.is_user_facing() => StatusCode::BAD_REQUEST,
			ServerError::AuthProvider(_) => StatusCode::BAD_GATEWAY,
			ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			ServerError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
		}
	}

	fn code(&self) -> &'static str {
		error_code(self.status_code())
	}

	/// Message safe to show to the caller. Internal detail stays in the logs.
	pub fn public_message(&self) -> String {
		match self {
			ServerError::Db(e) => e.user_message(),
			ServerError::AuthProvider(e) if e.is_user_facing() => e.to_string(),
			ServerError::AuthProvider(_) => "Authentication service unavailable".to_string(),
			ServerError::Internal(_) => "An internal error occurred".to_string(),
			ServerError::NotFound(m)
			| ServerError::Conflict(m)
			| ServerError::BadRequest(m)
			| ServerError::Unauthorized(m)
			| ServerError::Forbidden(m)
			| ServerError::ServiceUnavailable(m) => m.clone(),
		}
	}
}

/// Machine-readable `error` value for a status.
pub fn error_code(status: StatusCode) -> &'static str {
	match status {
		StatusCode::NOT_FOUND => "not_found",
		StatusCode::CONFLICT => "conflict",
		StatusCode::FORBIDDEN => "forbidden",
		StatusCode::BAD_REQUEST => "bad_request",
		StatusCode::UNAUTHORIZED => "unauthorized",
		StatusCode::BAD_GATEWAY => "upstream_error",
		StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
		_ => "internal_error",
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
			tracing::error!(error = %self, status = %status, "request failed");
		} else {
			tracing::debug!(error = %self, status = %status, "request rejected");
		}

		let body = ErrorResponse::with_message(self.code(), self.public_message());
		(status, Json(body)).into_response()
	}
}
