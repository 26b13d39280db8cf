// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP route handlers.

pub mod auth;
pub mod check_invites;
pub mod health;
pub mod invite;
pub mod logs;
pub mod team;

use axum::{
	http::{header::SET_COOKIE, HeaderValue},
	response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use guild_server_auth::ProviderSession;

use crate::api::AppState;

/// 303 to `location`, setting the session cookie when a session was opened.
pub(crate) fn redirect_with_session(
	state: &AppState,
	location: &str,
	session: Option<&ProviderSession>,
) -> Response {
	let mut response = Redirect::to(location).into_response();
	if let Some(session) = session {
		let cookie = state.session_cookie.issue(
			session.session_token.expose(),
			session.expires_at,
			Utc::now(),
		);
		match HeaderValue::from_str(&cookie) {
			Ok(value) => {
				response.headers_mut().append(SET_COOKIE, value);
			}
			Err(e) => tracing::error!(error = %e, "session cookie is not a valid header value"),
		}
	}
	response
}
