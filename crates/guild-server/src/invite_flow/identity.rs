// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity resolution for a single request.
//!
//! The email on a resolved identity always comes from the auth provider,
//! never from the request body.

use std::sync::Arc;

use guild_server_auth::{AuthProvider, Identity, OneTimeTokenType, ProviderSession};

/// Credentials carried by a request that may authenticate it.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
	/// Value of the session cookie.
	pub session_token: Option<String>,
	/// One-time token from a magic link.
	pub one_time_token: Option<String>,
	/// Raw `type` query parameter accompanying the one-time token.
	pub token_type: Option<String>,
}

impl RequestCredentials {
	pub fn with_session(session_token: Option<String>) -> Self {
		Self {
			session_token,
			..Default::default()
		}
	}

	/// The one-time token, when it is a magic link.
	fn magic_link(&self) -> Option<&str> {
		let token = self.one_time_token.as_deref().filter(|t| !t.is_empty())?;
		let ty = self.token_type.as_deref()?.parse::<OneTimeTokenType>().ok()?;
		(ty == OneTimeTokenType::MagicLink).then_some(token)
	}
}

#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
	pub identity: Identity,
	/// Set when a one-time token was exchanged for a new session during this
	/// request. The caller must hand it to the client.
	pub issued_session: Option<ProviderSession>,
}

#[derive(Debug, Clone)]
pub enum ResolvedIdentity {
	Authenticated(AuthenticatedIdentity),
	Unauthenticated,
	VerificationFailed(String),
}

#[derive(Clone)]
pub struct IdentityResolver {
	provider: Arc<dyn AuthProvider>,
}

impl IdentityResolver {
	pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
		Self { provider }
	}

	/// A magic-link token takes precedence over an existing session. A failed
	/// verification is reported, not downgraded to the session.
	#[tracing::instrument(skip_all, fields(has_session = credentials.session_token.is_some()))]
	pub async fn resolve(&self, credentials: &RequestCredentials) -> ResolvedIdentity {
		if let Some(token) = credentials.magic_link() {
			return match self
				.provider
				.verify_one_time_token(token, OneTimeTokenType::MagicLink)
				.await
			{
				Ok(session) => {
					tracing::debug!(user_id = %session.identity.id, "magic link verified");
					ResolvedIdentity::Authenticated(AuthenticatedIdentity {
						identity: session.identity.clone(),
						issued_session: Some(session),
					})
				}
				Err(e) => {
					tracing::info!(error = %e, "magic link verification failed");
					ResolvedIdentity::VerificationFailed(e.to_string())
				}
			};
		}

		let Some(session_token) = credentials.session_token.as_deref() else {
			return ResolvedIdentity::Unauthenticated;
		};

		match self.provider.get_current_session(session_token).await {
			Ok(Some(identity)) => ResolvedIdentity::Authenticated(AuthenticatedIdentity {
				identity,
				issued_session: None,
			}),
			Ok(None) => ResolvedIdentity::Unauthenticated,
			Err(e) => {
				tracing::warn!(error = %e, "session lookup failed, treating request as unauthenticated");
				ResolvedIdentity::Unauthenticated
			}
		}
	}
}
