// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization pages and management actions.
//!
//! Every handler requires a session. Role checks that guard writes live in
//! the store transactions; handlers only shape the responses.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Redirect, Response},
	Form, Json,
};
use guild_server_api::{
	ActionResponse, CreateInviteForm, CreateInviteResponse, CreateTeamPageContext, ErrorResponse,
	OrgNameForm, OrganizationResponse, PendingInviteResponse, TeamMemberResponse, TeamPageContext,
	TeamQuery, UpdateOrganizationResponse, UserOrganizationResponse,
};

use crate::{
	api::AppState,
	auth_middleware::RequireSession,
	error::{error_code, ServerError},
	invite_flow::ProfileBootstrapper,
	validation::{parse_email, parse_invite_id, parse_org_id, parse_org_name, parse_org_role},
};

const CREATE_PATH: &str = "/team/create";
const INDEX_PATH: &str = "/team";
pub const ORG_UPDATED_MESSAGE: &str = "Organization name updated successfully";
pub const PROFILE_FAILED_PREFIX: &str = "Failed to create user profile: ";

#[utoipa::path(
    get,
    path = "/team",
    responses(
        (status = 303, description = "To the first organization, or to the create page")
    ),
    tag = "teams"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
pub async fn team_index(
	State(state): State<AppState>,
	RequireSession(user): RequireSession,
) -> Result<Response, ServerError> {
	let orgs = state.orgs.list_user_organizations(&user.id()).await?;
	let location = match orgs.first() {
		Some(first) => format!("/team/{}", first.organization.id),
		None => CREATE_PATH.to_string(),
	};
	Ok(Redirect::to(&location).into_response())
}

#[utoipa::path(
    get,
    path = "/team/create",
    responses(
        (status = 200, description = "Create page context", body = CreateTeamPageContext),
        (status = 303, description = "Not signed in; to the login page")
    ),
    tag = "teams"
)]
pub async fn create_team_page(RequireSession(_user): RequireSession) -> Json<CreateTeamPageContext> {
	Json(CreateTeamPageContext::default())
}

/// Create an organization owned by the caller.
///
/// The caller's profile must exist first, since memberships reference it.
///
/// # Errors
///
/// - `400 Bad Request`: Blank or overlong name
/// - `500 Internal Server Error`: Profile or organization could not be created
#[utoipa::path(
    post,
    path = "/team/create",
    request_body(content = OrgNameForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; to the new organization's page"),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 500, description = "Profile or organization could not be created", body = ErrorResponse)
    ),
    tag = "teams"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id()))]
pub async fn create_team(
	State(state): State<AppState>,
	RequireSession(user): RequireSession,
	Form(form): Form<OrgNameForm>,
) -> Result<Response, ServerError> {
	let name = parse_org_name(&form.name)?;

	if let Err(e) = ProfileBootstrapper::new(state.profiles.clone())
		.ensure_strict(&user.identity)
		.await
	{
		tracing::error!(error = %e, "profile bootstrap failed before organization create");
		let body = ErrorResponse::with_message(
			error_code(StatusCode::INTERNAL_SERVER_ERROR),
			format!("{PROFILE_FAILED_PREFIX}{}", e.user_message()),
		);
		return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
	}

	let org = state.orgs.create_organization(&name, &user.id()).await?;
	tracing::info!(org_id = %org.id, "organization created");
	Ok(Redirect::to(&format!("/team/{}?created=true", org.id)).into_response())
}

/// Team page for one organization.
///
/// # Security
///
/// Non-members are redirected to `/team` rather than told the organization
/// exists. Pending invites are only listed for owners and admins.
#[utoipa::path(
    get,
    path = "/team/{org_id}",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        TeamQuery
    ),
    responses(
        (status = 200, description = "Team page context", body = TeamPageContext),
        (status = 303, description = "Not a member; to /team")
    ),
    tag = "teams"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id(), org_id = %org_id))]
pub async fn team_page(
	State(state): State<AppState>,
	RequireSession(user): RequireSession,
	Path(org_id): Path<String>,
	Query(query): Query<TeamQuery>,
) -> Result<Response, ServerError> {
	let Ok(org_id) = parse_org_id(&org_id) else {
		return Ok(Redirect::to(INDEX_PATH).into_response());
	};
	let Some(membership) = state.orgs.get_membership(&org_id, &user.id()).await? else {
		tracing::debug!("caller is not a member, redirecting");
		return Ok(Redirect::to(INDEX_PATH).into_response());
	};
	let Some(org) = state.orgs.get_org_by_id(&org_id).await? else {
		return Ok(Redirect::to(INDEX_PATH).into_response());
	};

	let members = state.orgs.list_members(&org_id).await?;
	let organizations = state.orgs.list_user_organizations(&user.id()).await?;
	let pending_invites = if membership.role.can_manage() {
		state.invites.list_pending_invites(&org_id).await?
	} else {
		Vec::new()
	};

	let ctx = TeamPageContext {
		current_organization: OrganizationResponse::from(&org),
		user_role: membership.role.to_string(),
		team_members: members.iter().map(TeamMemberResponse::from).collect(),
		pending_invites: pending_invites
			.iter()
			.map(PendingInviteResponse::from)
			.collect(),
		organizations: organizations
			.iter()
			.map(UserOrganizationResponse::from)
			.collect(),
		just_created: query.just_created(),
		success: query.success,
		error: query.error,
	};
	Ok(Json(ctx).into_response())
}

/// Invite an address into the organization and return the shareable link.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email or role, caller may not invite with
///   that role, address already a member, or a pending invite exists
#[utoipa::path(
    post,
    path = "/team/{org_id}/invite",
    params(("org_id" = String, Path, description = "Organization id")),
    request_body(content = CreateInviteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Invite created", body = CreateInviteResponse),
        (status = 400, description = "Invalid input, insufficient role, or duplicate", body = ErrorResponse)
    ),
    tag = "teams"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id(), org_id = %org_id))]
pub async fn invite_member(
	State(state): State<AppState>,
	RequireSession(user): RequireSession,
	Path(org_id): Path<String>,
	Form(form): Form<CreateInviteForm>,
) -> Result<Json<CreateInviteResponse>, ServerError> {
	let org_id = parse_org_id(&org_id)?;
	let email = parse_email(&form.email)?;
	let role = parse_org_role(&form.role)?;

	let created = state
		.invites
		.create_invite(&org_id, &email, role, &user.id(), state.invite_expiry)
		.await
		.map_err(|e| {
			tracing::info!(error = %e, "invite not created");
			ServerError::BadRequest(e.user_message())
		})?;

	tracing::info!(invite_id = %created.invite.id, role = %role, "invite created");
	Ok(Json(CreateInviteResponse {
		success: true,
		invite_url: state.url(&format!("/invite/{}", created.token)),
		development_mode: true,
	}))
}

/// Rename the organization.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid org id or name
/// - `403 Forbidden`: Caller is not an owner or admin
/// - `404 Not Found`: Organization does not exist
#[utoipa::path(
    post,
    path = "/team/{org_id}/update",
    params(("org_id" = String, Path, description = "Organization id")),
    request_body(content = OrgNameForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Renamed", body = UpdateOrganizationResponse),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 403, description = "Caller is not an owner or admin", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "teams"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id(), org_id = %org_id))]
pub async fn update_team(
	State(state): State<AppState>,
	RequireSession(user): RequireSession,
	Path(org_id): Path<String>,
	Form(form): Form<OrgNameForm>,
) -> Result<Json<UpdateOrganizationResponse>, ServerError> {
	let org_id = parse_org_id(&org_id)?;
	let name = parse_org_name(&form.name)?;
	state
		.orgs
		.update_organization(&org_id, &name, &user.id())
		.await?;
	Ok(Json(UpdateOrganizationResponse {
		update_success: true,
		message: ORG_UPDATED_MESSAGE.to_string(),
	}))
}

/// Revoke a pending invite. Its token stops working immediately.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner or admin
/// - `404 Not Found`: No such invite in this organization
/// - `409 Conflict`: Invite was already accepted or revoked
#[utoipa::path(
    post,
    path = "/team/{org_id}/invites/{invite_id}/revoke",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("invite_id" = String, Path, description = "Invite id")
    ),
    responses(
        (status = 200, description = "Revoked", body = ActionResponse),
        (status = 403, description = "Caller is not an owner or admin", body = ErrorResponse),
        (status = 404, description = "No such invite", body = ErrorResponse),
        (status = 409, description = "Invite is no longer pending", body = ErrorResponse)
    ),
    tag = "teams"
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id(), org_id = %org_id, invite_id = %invite_id))]
pub async fn revoke_invite(
	State(state): State<AppState>,
	RequireSession(user): RequireSession,
	Path((org_id, invite_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ServerError> {
	let org_id = parse_org_id(&org_id)?;
	let invite_id = parse_invite_id(&invite_id)?;
	state
		.invites
		.revoke_invite(&org_id, &invite_id, &user.id())
		.await?;
	Ok(Json(ActionResponse::with_message("Invite revoked")))
}
