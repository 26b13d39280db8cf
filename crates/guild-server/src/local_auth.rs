// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built-in auth provider backed by the server's own database.
//!
//! Magic-link tokens are Argon2id hashes at rest, so verification scans the
//! pending links and then claims the match atomically. Sessions are random
//! tokens stored as SHA-256 digests.
//!
//! # Security
//!
//! - Plaintext magic-link and session tokens are never logged outside dev mode.
//! - A new link request burns every older unused link for the same address.
//! - A link can be claimed by exactly one request.

use std::sync::Arc;

use async_trait::async_trait;
use guild_server_auth::{
	hash_token,
	magic_link::{magic_link_url, MagicLink},
	normalize_email, AuthProvider, AuthProviderError, Identity, OneTimeTokenType, ProviderSession,
	SecretString, Session,
};
use guild_server_db::{DbError, SessionStore, UserStore};

/// Where issued magic links go.
#[async_trait]
pub trait LinkDelivery: Send + Sync {
	async fn deliver(&self, email: &str, link: &SecretString) -> Result<(), AuthProviderError>;
}

/// Delivery used when no mail transport is configured. In dev mode the link is
/// written to the log so it can be followed by hand.
#[derive(Debug, Clone, Copy)]
pub struct LogDelivery {
	pub dev_mode: bool,
}

#[async_trait]
impl LinkDelivery for LogDelivery {
	async fn deliver(&self, email: &str, link: &SecretString) -> Result<(), AuthProviderError> {
		if self.dev_mode {
			tracing::info!(email = %email, link = %link.expose(), "dev mode: magic link");
		} else {
			tracing::warn!(
				email = %email,
				"Email delivery not configured, magic link not sent - user will not receive email"
			);
		}
		Ok(())
	}
}

pub struct LocalAuthProvider {
	users: Arc<dyn UserStore>,
	sessions: Arc<dyn SessionStore>,
	delivery: Arc<dyn LinkDelivery>,
	signups_disabled: bool,
}

impl LocalAuthProvider {
	pub fn new(
		users: Arc<dyn UserStore>,
		sessions: Arc<dyn SessionStore>,
		delivery: Arc<dyn LinkDelivery>,
		signups_disabled: bool,
	) -> Self {
		Self {
			users,
			sessions,
			delivery,
			signups_disabled,
		}
	}

	async fn open_session(&self, identity: Identity) -> Result<ProviderSession, AuthProviderError> {
		let (session, token) = Session::start(identity.id);
		self.sessions.create_session(&session).await.map_err(storage)?;
		tracing::info!(user_id = %identity.id, "session started");
		Ok(ProviderSession {
			identity,
			session_token: token,
			expires_at: session.expires_at,
		})
	}
}

fn storage(e: DbError) -> AuthProviderError {
	tracing::error!(error = %e, "auth storage failure");
	AuthProviderError::Storage(e.to_string())
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
	#[tracing::instrument(skip(self, email, redirect_to))]
	async fn send_magic_link(
		&self,
		email: &str,
		redirect_to: &str,
		create_user: bool,
	) -> Result<(), AuthProviderError> {
		let email = normalize_email(email);

		let known = self.users.get_user_by_email(&email).await.map_err(storage)?;
		if known.is_none() && (self.signups_disabled || !create_user) {
			tracing::debug!("magic link refused for unknown address");
			return Err(AuthProviderError::SignupsDisabled);
		}

		if let Err(e) = self.sessions.invalidate_magic_links_for_email(&email).await {
			tracing::warn!(error = %e, "Failed to invalidate existing magic links");
		}

		let issued =
			MagicLink::issue(&email).map_err(|e| AuthProviderError::Storage(e.to_string()))?;
		self
			.sessions
			.create_magic_link(&issued.link)
			.await
			.map_err(storage)?;

		let url = magic_link_url(redirect_to, &issued.token)
			.map_err(|e| AuthProviderError::Provider(e.to_string()))?;
		self
			.delivery
			.deliver(&email, &SecretString::new(url))
			.await?;

		tracing::info!(link_id = %issued.link.id, "magic link issued");
		Ok(())
	}

	#[tracing::instrument(skip(self, token), fields(token_type = %token_type))]
	async fn verify_one_time_token(
		&self,
		token: &str,
		token_type: OneTimeTokenType,
	) -> Result<ProviderSession, AuthProviderError> {
		match token_type {
			OneTimeTokenType::MagicLink
			| OneTimeTokenType::Email
			| OneTimeTokenType::Signup
			| OneTimeTokenType::Invite => {}
			OneTimeTokenType::Recovery => return Err(AuthProviderError::Unsupported("recovery")),
			OneTimeTokenType::EmailChange => {
				return Err(AuthProviderError::Unsupported("email change"))
			}
		}

		let pending = self.sessions.get_pending_magic_links().await.map_err(storage)?;
		let Some(link) = pending.into_iter().find(|link| link.matches(token)) else {
			tracing::debug!("Magic link not found or invalid token");
			return Err(AuthProviderError::InvalidCredential);
		};

		if !self.sessions.claim_magic_link(&link).await.map_err(storage)? {
			tracing::debug!(link_id = %link.id, "Magic link already claimed by another request");
			return Err(AuthProviderError::InvalidCredential);
		}

		let identity = self
			.users
			.find_or_create_user(&link.email)
			.await
			.map_err(storage)?;
		tracing::info!(user_id = %identity.id, "User authenticated via magic link");
		self.open_session(identity).await
	}

	async fn exchange_code_for_session(
		&self,
		_code: &str,
	) -> Result<ProviderSession, AuthProviderError> {
		Err(AuthProviderError::Unsupported("OAuth code exchange"))
	}

	#[tracing::instrument(skip(self, session_token))]
	async fn get_current_session(
		&self,
		session_token: &str,
	) -> Result<Option<Identity>, AuthProviderError> {
		self
			.sessions
			.get_session_identity(&hash_token(session_token))
			.await
			.map_err(storage)
	}

	#[tracing::instrument(skip(self, session_token))]
	async fn sign_out(&self, session_token: &str) -> Result<(), AuthProviderError> {
		let deleted = self
			.sessions
			.delete_session(&hash_token(session_token))
			.await
			.map_err(storage)?;
		tracing::debug!(deleted, "session signed out");
		Ok(())
	}
}
