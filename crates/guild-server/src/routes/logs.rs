// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Browser log ingestion.

use axum::{
	extract::rejection::JsonRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use guild_server_api::{ActionResponse, ClientLogEntry, ClientLogLevel, ErrorResponse};

pub const INVALID_LOG_ENTRY: &str = "Invalid log entry";

/// POST /api/logs - re-emit a browser log entry through the server's tracing.
///
/// # Errors
///
/// - `400 Bad Request`: Body is not JSON, or `level`/`message` is missing
#[utoipa::path(
    post,
    path = "/api/logs",
    request_body = ClientLogEntry,
    responses(
        (status = 200, description = "Entry recorded", body = ActionResponse),
        (status = 400, description = "Missing level or message", body = ErrorResponse)
    ),
    tag = "api"
)]
pub async fn ingest_client_log(body: Result<Json<ClientLogEntry>, JsonRejection>) -> Response {
	let entry = match body {
		Ok(Json(entry)) => entry,
		Err(rejection) => {
			tracing::debug!(error = %rejection, "unparseable client log entry");
			return invalid_entry();
		}
	};
	let Some((level, message)) = entry.validated() else {
		return invalid_entry();
	};

	let prefix = level.prefix();
	let timestamp = entry.timestamp.as_deref().unwrap_or("-");
	let environment = entry.environment.as_deref().unwrap_or("unknown");
	let client = entry.client.as_ref().map(|c| c.to_string()).unwrap_or_default();
	let context = entry.context.as_ref().map(|c| c.to_string()).unwrap_or_default();

	match level {
		ClientLogLevel::Error => {
			tracing::error!(%timestamp, %environment, %client, %context, "{prefix} {message}")
		}
		ClientLogLevel::Warn => {
			tracing::warn!(%timestamp, %environment, %client, %context, "{prefix} {message}")
		}
		ClientLogLevel::Info => {
			tracing::info!(%timestamp, %environment, %client, %context, "{prefix} {message}")
		}
		ClientLogLevel::Debug => {
			tracing::debug!(%timestamp, %environment, %client, %context, "{prefix} {message}")
		}
	}

	Json(ActionResponse::ok()).into_response()
}

fn invalid_entry() -> Response {
	(
		StatusCode::BAD_REQUEST,
		Json(ErrorResponse::new(INVALID_LOG_ENTRY)),
	)
		.into_response()
}
