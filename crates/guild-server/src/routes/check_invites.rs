// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use guild_server_api::{CheckInvitesResponse, ErrorResponse, JoinedOrganizationResponse};

use crate::{api::AppState, auth_middleware::RequireAuth, error::ServerError};

/// POST /api/check-invites - accept every live invite addressed to the
/// caller's email for organizations they have not joined.
///
/// # Errors
///
/// - `401 Unauthorized`: No session
/// - `400 Bad Request`: Invites could not be checked
#[utoipa::path(
    post,
    path = "/api/check-invites",
    responses(
        (status = 200, description = "Pending invites accepted", body = CheckInvitesResponse),
        (status = 400, description = "Store failure", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    tag = "api"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
pub async fn check_invites(
	State(state): State<AppState>,
	RequireAuth(user): RequireAuth,
) -> Result<Json<CheckInvitesResponse>, ServerError> {
	let accepted = state
		.invites
		.check_pending_invites(&user.id(), user.email())
		.await
		.map_err(|e| {
			tracing::warn!(error = %e, "checking pending invites failed");
			ServerError::BadRequest(e.user_message())
		})?;

	let invites: Vec<JoinedOrganizationResponse> = accepted
		.iter()
		.map(|a| JoinedOrganizationResponse {
			organization_id: a.organization_id.to_string(),
			organization_name: a.organization_name.clone(),
			role: a.role.to_string(),
		})
		.collect();

	Ok(Json(CheckInvitesResponse {
		success: true,
		accepted_count: invites.len(),
		invites,
	}))
}
