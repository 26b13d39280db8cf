// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invite HTTP handlers: the web surface of the invite flow.
//!
//! | Endpoint                          | Auth                       |
//! |-----------------------------------|----------------------------|
//! | `GET /invite/{token}`             | optional                   |
//! | `POST /invite/{token}/accept`     | session                    |
//! | `POST /invite/{token}/signup`     | none                       |
//! | `GET /invite/{token}/accept`      | session or magic link      |

use axum::{
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	Form, Json,
};
use guild_server_api::{
	AcceptQuery, ActionResponse, EmailForm, ErrorResponse, InvitePageContext, MessageQuery,
};
use guild_server_auth::emails_match;

use crate::{
	api::AppState,
	auth_middleware::{session_token, OptionalAuth},
	error::{error_code, ServerError},
	invite_flow::{FlowOutcome, RequestCredentials},
	routes::{auth::send_link, redirect_with_session},
};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Must be logged in to accept invite";
pub const EMAIL_REQUIRED_MESSAGE: &str = "Email is required";
pub const EMAIL_MISMATCH_MESSAGE: &str = "Email does not match the invitation";
pub const CHECK_EMAIL_MESSAGE: &str = "Check your email for a sign-in link!";

fn flow_response(state: &AppState, outcome: FlowOutcome) -> Response {
	match outcome {
		FlowOutcome::Render(ctx) => Json(ctx).into_response(),
		FlowOutcome::RenderError { status, message } => error_page(status, message),
		FlowOutcome::ControlTransfer(redirect) => {
			redirect_with_session(state, &redirect.location, redirect.issued_session.as_ref())
		}
	}
}

fn error_page(status: StatusCode, message: String) -> Response {
	(status, Json(ErrorResponse::with_message(error_code(status), message))).into_response()
}

/// Render the invite page context for `token`.
///
/// The signed-in caller, when there is one, decides whether the page offers
/// direct acceptance or shows the wrong-account notice.
///
/// # Errors
///
/// - `400 Bad Request`: Invite expired, accepted or revoked
/// - `404 Not Found`: No invite for this token
/// - `500 Internal Server Error`: Invite could not be loaded
#[utoipa::path(
    get,
    path = "/invite/{token}",
    params(
        ("token" = String, Path, description = "Invite token"),
        MessageQuery
    ),
    responses(
        (status = 200, description = "Invite page context", body = InvitePageContext),
        (status = 400, description = "Invite expired or already processed", body = ErrorResponse),
        (status = 404, description = "Invite not found", body = ErrorResponse)
    ),
    tag = "invites"
)]
#[tracing::instrument(skip_all)]
pub async fn view_invite(
	State(state): State<AppState>,
	Path(token): Path<String>,
	OptionalAuth(user): OptionalAuth,
	Query(query): Query<MessageQuery>,
) -> Response {
	let identity = user.as_ref().map(|u| &u.identity);
	let outcome = state.invite_flow.view(&token, identity, query.error).await;
	flow_response(&state, outcome)
}

/// Accept with the current session.
///
/// # Errors
///
/// - `401 Unauthorized`: No session; checked before the token is looked up
/// - `400 Bad Request` / `404 Not Found`: Invite cannot be accepted
///
/// Reconciliation failures are not errors here: they redirect back to the
/// invite page with an `error` message.
#[utoipa::path(
    post,
    path = "/invite/{token}/accept",
    params(("token" = String, Path, description = "Invite token")),
    responses(
        (status = 303, description = "To the team page on success, back to the invite on failure"),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    tag = "invites"
)]
#[tracing::instrument(skip_all)]
pub async fn accept_invite(
	State(state): State<AppState>,
	Path(token): Path<String>,
	OptionalAuth(user): OptionalAuth,
) -> Result<Response, ServerError> {
	let user = user.ok_or_else(|| ServerError::Unauthorized(LOGIN_REQUIRED_MESSAGE.to_string()))?;
	let outcome = state.invite_flow.accept_as(&token, &user.identity).await;
	Ok(flow_response(&state, outcome))
}

/// Landing point of the invite magic link. Verifies the link when present,
/// then accepts.
///
/// # Security
///
/// The accepting email is always the one the provider verified, never one
/// taken from the request.
#[utoipa::path(
    get,
    path = "/invite/{token}/accept",
    params(
        ("token" = String, Path, description = "Invite token"),
        AcceptQuery
    ),
    responses(
        (status = 303, description = "To the team page, or back to the invite"),
        (status = 400, description = "Invite expired or already processed", body = ErrorResponse),
        (status = 404, description = "Invite not found", body = ErrorResponse)
    ),
    tag = "invites"
)]
#[tracing::instrument(skip_all)]
pub async fn accept_after_verification(
	State(state): State<AppState>,
	Path(token): Path<String>,
	Query(query): Query<AcceptQuery>,
	headers: HeaderMap,
) -> Response {
	let credentials = RequestCredentials {
		session_token: session_token(&headers, &state),
		one_time_token: query.token,
		token_type: query.token_type,
	};
	let outcome = state.invite_flow.accept(&token, &credentials).await;
	flow_response(&state, outcome)
}

/// Send a magic link that returns to the accept endpoint.
///
/// # Errors
///
/// - `400 Bad Request`: Blank email, email differs from the invite, or the
///   invite is no longer usable
/// - `404 Not Found`: No invite for this token
/// - `502 Bad Gateway`: Provider could not send the link
#[utoipa::path(
    post,
    path = "/invite/{token}/signup",
    params(("token" = String, Path, description = "Invite token")),
    request_body(content = EmailForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Magic link sent", body = ActionResponse),
        (status = 400, description = "Missing or mismatched email, or unusable invite", body = ErrorResponse),
        (status = 404, description = "Invite not found", body = ErrorResponse)
    ),
    tag = "invites"
)]
#[tracing::instrument(skip_all)]
pub async fn signup_for_invite(
	State(state): State<AppState>,
	Path(token): Path<String>,
	Form(form): Form<EmailForm>,
) -> Result<Response, ServerError> {
	if form.email.trim().is_empty() {
		return Err(ServerError::BadRequest(EMAIL_REQUIRED_MESSAGE.to_string()));
	}

	let valid = match state.invite_flow.validator().validate(&token).await {
		Ok(valid) => valid,
		Err(e) => return Ok(error_page(e.status_code(), e.user_message())),
	};

	if !emails_match(&form.email, &valid.invite.email) {
		tracing::debug!(invite_id = %valid.invite.id, "signup email differs from invite");
		return Err(ServerError::BadRequest(EMAIL_MISMATCH_MESSAGE.to_string()));
	}

	let accept_path = format!("/invite/{}/accept", urlencoding::encode(&token));
	send_link(&state, &form.email, &accept_path).await?;
	Ok(Json(ActionResponse::with_message(CHECK_EMAIL_MESSAGE)).into_response())
}
