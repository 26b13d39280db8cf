// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Magic-link sign-in, the provider callbacks, and sign-out.
//!
//! # Security
//!
//! - Tokens from query strings are never logged
//! - The session cookie is `HttpOnly` and `SameSite=Lax`
//! - Identities always come from the provider, never from form input

use axum::{
	extract::{Query, State},
	http::{header::SET_COOKIE, HeaderMap, HeaderValue},
	response::Response,
	Form, Json,
};
use guild_server_api::{ActionResponse, CallbackQuery, ConfirmQuery, EmailForm, ErrorResponse};
use guild_server_auth::{AuthProviderError, OneTimeTokenType, ProviderSession};

use crate::{
	api::AppState,
	auth_middleware::{session_token, LOGIN_PATH},
	error::ServerError,
	invite_flow::ProfileBootstrapper,
	routes::redirect_with_session,
	validation::parse_email,
};

const SIGNED_IN_PATH: &str = "/team";
const CONFIRMED_PATH: &str = "/dashboard";

/// Validate the address and ask the provider to mail a link back to
/// `callback_path`.
pub(crate) async fn send_link(
	state: &AppState,
	email: &str,
	callback_path: &str,
) -> Result<(), ServerError> {
	let email = parse_email(email)?;
	state
		.auth_provider
		.send_magic_link(&email, &state.url(callback_path), true)
		.await?;
	tracing::info!(email = %email, "magic link requested");
	Ok(())
}

fn login_error_location(e: &AuthProviderError) -> String {
	let message = if e.is_user_facing() {
		e.to_string()
	} else {
		"Authentication failed".to_string()
	};
	format!("{LOGIN_PATH}?error={}", urlencoding::encode(&message))
}

/// Session established: bootstrap the profile and land on `location`.
async fn signed_in(state: &AppState, session: &ProviderSession, location: &str) -> Response {
	ProfileBootstrapper::new(state.profiles.clone())
		.ensure(&session.identity)
		.await;
	tracing::info!(user_id = %session.identity.id, "user signed in");
	redirect_with_session(state, location, Some(session))
}

/// Send a sign-in link for an existing or new account.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email, or the provider refused the address
/// - `502 Bad Gateway`: Provider unreachable
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = EmailForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Magic link sent", body = ActionResponse),
        (status = 400, description = "Invalid email or provider refusal", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, form))]
pub async fn login(
	State(state): State<AppState>,
	Form(form): Form<EmailForm>,
) -> Result<Json<ActionResponse>, ServerError> {
	send_link(&state, &form.email, "/auth/callback").await?;
	Ok(Json(ActionResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body(content = EmailForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Magic link sent", body = ActionResponse),
        (status = 400, description = "Invalid email or provider refusal", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, form))]
pub async fn signup(
	State(state): State<AppState>,
	Form(form): Form<EmailForm>,
) -> Result<Json<ActionResponse>, ServerError> {
	send_link(&state, &form.email, "/auth/callback").await?;
	Ok(Json(ActionResponse::ok()))
}

/// GET /auth/callback - landing point for magic links and OAuth codes.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Signed in, or back to login with an error")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, query))]
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
	let is_magic_link = query
		.token_type
		.as_deref()
		.and_then(|t| t.parse::<OneTimeTokenType>().ok())
		== Some(OneTimeTokenType::MagicLink);

	let result = match (query.token.as_deref(), query.code.as_deref()) {
		(Some(token), _) if is_magic_link && !token.is_empty() => {
			state
				.auth_provider
				.verify_one_time_token(token, OneTimeTokenType::MagicLink)
				.await
		}
		(_, Some(code)) if !code.is_empty() => {
			state.auth_provider.exchange_code_for_session(code).await
		}
		_ => return redirect_with_session(&state, LOGIN_PATH, None),
	};

	match result {
		Ok(session) => signed_in(&state, &session, SIGNED_IN_PATH).await,
		Err(e) => {
			tracing::info!(error = %e, "sign-in callback failed");
			redirect_with_session(&state, &login_error_location(&e), None)
		}
	}
}

/// GET /auth/confirm - email confirmation links of any supported type.
#[utoipa::path(
    get,
    path = "/auth/confirm",
    params(ConfirmQuery),
    responses(
        (status = 303, description = "Confirmed and signed in, or back to login")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, query))]
pub async fn confirm(State(state): State<AppState>, Query(query): Query<ConfirmQuery>) -> Response {
	let token_type = query
		.token_type
		.as_deref()
		.and_then(|t| t.parse::<OneTimeTokenType>().ok());

	let (Some(token_hash), Some(token_type)) = (query.token_hash.as_deref(), token_type) else {
		return redirect_with_session(&state, LOGIN_PATH, None);
	};

	match state
		.auth_provider
		.verify_one_time_token(token_hash, token_type)
		.await
	{
		Ok(session) => {
			tracing::info!(
				user_id = %session.identity.id,
				token_type = %token_type,
				"confirmation verified"
			);
			redirect_with_session(&state, CONFIRMED_PATH, Some(&session))
		}
		Err(e) => {
			tracing::info!(error = %e, "confirmation failed");
			redirect_with_session(&state, LOGIN_PATH, None)
		}
	}
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 303, description = "Signed out")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
	if let Some(token) = session_token(&headers, &state) {
		if let Err(e) = state.auth_provider.sign_out(&token).await {
			tracing::warn!(error = %e, "provider sign-out failed, clearing cookie anyway");
		}
	}

	let mut response = redirect_with_session(&state, LOGIN_PATH, None);
	if let Ok(value) = HeaderValue::from_str(&state.session_cookie.clear()) {
		response.headers_mut().append(SET_COOKIE, value);
	}
	response
}
