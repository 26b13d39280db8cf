// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication middleware for Axum.
//!
//! [`auth_layer`] resolves the session cookie through the configured
//! [`guild_server_auth::AuthProvider`] and stores an [`AuthContext`] in the
//! request extensions. Handlers then pick one of the extractors:
//!
//! - [`RequireAuth`]: JSON APIs, 401 when signed out
//! - [`RequireSession`]: page routes, 303 to `/auth/login` when signed out
//! - [`OptionalAuth`]: never rejects
//!
//! Session tokens are never logged.

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{request::Parts, HeaderMap, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Redirect, Response},
	Json,
};
use guild_server_api::ErrorResponse;
use guild_server_auth::{extract_session_cookie_with_name, AuthContext, CurrentUser};
use tracing::instrument;

use crate::api::AppState;

pub const LOGIN_PATH: &str = "/auth/login";

/// Resolve the session cookie and attach an [`AuthContext`].
///
/// A provider failure is logged and the request continues unauthenticated.
#[instrument(
	name = "auth_layer",
	skip(state, request, next),
	fields(user_id = tracing::field::Empty)
)]
pub async fn auth_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let ctx = match extract_session_cookie_with_name(
		request.headers(),
		&state.session_cookie.name,
	) {
		Some(token) => authenticate_session(&state, &token).await,
		None => AuthContext::unauthenticated(),
	};

	if let Some(user) = ctx.user() {
		tracing::Span::current().record("user_id", tracing::field::display(user.id()));
	}
	request.extensions_mut().insert(ctx);
	next.run(request).await
}

async fn authenticate_session(state: &AppState, token: &str) -> AuthContext {
	match state.auth_provider.get_current_session(token).await {
		Ok(Some(identity)) => AuthContext::authenticated(CurrentUser::new(identity)),
		Ok(None) => {
			tracing::debug!("session cookie did not resolve to an identity");
			AuthContext::unauthenticated()
		}
		Err(e) => {
			tracing::warn!(error = %e, "session lookup failed, continuing unauthenticated");
			AuthContext::unauthenticated()
		}
	}
}

fn current_user(parts: &Parts) -> Option<CurrentUser> {
	parts
		.extensions
		.get::<AuthContext>()
		.and_then(|ctx| ctx.current_user.clone())
}

/// Session cookie value of the request, for flows that talk to the provider
/// directly.
pub fn session_token(headers: &HeaderMap, state: &AppState) -> Option<String> {
	extract_session_cookie_with_name(headers, &state.session_cookie.name)
}

/// Extractor that requires an authenticated user; 401 JSON otherwise.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match current_user(parts) {
			Some(user) => Ok(RequireAuth(user)),
			None => {
				tracing::debug!("Authentication required: no valid credentials");
				let body = Json(ErrorResponse::new("Unauthorized"));
				Err((StatusCode::UNAUTHORIZED, body).into_response())
			}
		}
	}
}

/// Extractor for page routes: redirects to the login page when signed out.
#[derive(Debug, Clone)]
pub struct RequireSession(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireSession
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireSession::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match current_user(parts) {
			Some(user) => Ok(RequireSession(user)),
			None => {
				tracing::debug!("session required, redirecting to login");
				Err(Redirect::to(LOGIN_PATH).into_response())
			}
		}
	}
}

/// Extractor for optional authentication. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
	S: Send + Sync,
{
	type Rejection = std::convert::Infallible;

	#[instrument(name = "OptionalAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(OptionalAuth(current_user(parts)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use guild_server_auth::{Identity, UserId};

	fn parts_with(ctx: Option<AuthContext>) -> Parts {
		let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
		if let Some(ctx) = ctx {
			parts.extensions.insert(ctx);
		}
		parts
	}

	fn signed_in() -> AuthContext {
		AuthContext::authenticated(CurrentUser::new(Identity::new(UserId::generate(), "a@x.com")))
	}

	#[tokio::test]
	async fn require_auth_rejects_with_401() {
		let mut parts = parts_with(None);
		let rejection = RequireAuth::from_request_parts(&mut parts, &()).await.unwrap_err();
		assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn require_session_redirects_to_login() {
		let mut parts = parts_with(Some(AuthContext::unauthenticated()));
		let rejection = RequireSession::from_request_parts(&mut parts, &())
			.await
			.unwrap_err();
		assert_eq!(rejection.status(), StatusCode::SEE_OTHER);
		assert_eq!(rejection.headers()["location"], LOGIN_PATH);
	}

	#[tokio::test]
	async fn extractors_pass_through_signed_in_user() {
		let mut parts = parts_with(Some(signed_in()));
		let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &()).await.unwrap();
		assert_eq!(user.email(), "a@x.com");
		let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &()).await.unwrap();
		assert!(user.is_some());
	}
}
