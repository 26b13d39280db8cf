// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use guild_server_api::HealthResponse;

use crate::api::AppState;

/// GET /health - liveness plus a database ping.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let (status, label) = match guild_server_db::ping(&state.pool).await {
		Ok(()) => (StatusCode::OK, "ok"),
		Err(e) => {
			tracing::error!(error = %e, "health check: database unreachable");
			(StatusCode::SERVICE_UNAVAILABLE, "unavailable")
		}
	};

	(
		status,
		Json(HealthResponse {
			status: label.to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
		}),
	)
}
