// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The seam between the application and whichever service issues identities.
//!
//! Handlers and the invite flow receive an `Arc<dyn AuthProvider>` from
//! application state, so tests substitute in-memory fakes.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guild_common_secret::SecretString;

use crate::types::ParseEnumError;
use crate::user::Identity;

/// Kind of one-time token presented for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OneTimeTokenType {
	MagicLink,
	Signup,
	Invite,
	Recovery,
	EmailChange,
	Email,
}

impl OneTimeTokenType {
	pub fn as_str(&self) -> &'static str {
		match self {
			OneTimeTokenType::MagicLink => "magiclink",
			OneTimeTokenType::Signup => "signup",
			OneTimeTokenType::Invite => "invite",
			OneTimeTokenType::Recovery => "recovery",
			OneTimeTokenType::EmailChange => "email_change",
			OneTimeTokenType::Email => "email",
		}
	}
}

impl fmt::Display for OneTimeTokenType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OneTimeTokenType {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"magiclink" => Ok(OneTimeTokenType::MagicLink),
			"signup" => Ok(OneTimeTokenType::Signup),
			"invite" => Ok(OneTimeTokenType::Invite),
			"recovery" => Ok(OneTimeTokenType::Recovery),
			"email_change" => Ok(OneTimeTokenType::EmailChange),
			"email" => Ok(OneTimeTokenType::Email),
			other => Err(ParseEnumError {
				kind: "token type",
				value: other.to_string(),
			}),
		}
	}
}

/// A session established by the provider, to be stored in the session cookie.
#[derive(Debug, Clone)]
pub struct ProviderSession {
	pub identity: Identity,
	pub session_token: SecretString,
	pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthProviderError {
	#[error("Token has expired or is invalid")]
	InvalidCredential,

	#[error("Token has expired")]
	Expired,

	#[error("Signups not allowed for this instance")]
	SignupsDisabled,

	#[error("{0} is not supported by this auth provider")]
	Unsupported(&'static str),

	#[error("auth provider request failed: {0}")]
	Http(String),

	#[error("{0}")]
	Provider(String),

	#[error("auth storage error: {0}")]
	Storage(String),
}

impl AuthProviderError {
	/// Whether the message is meant for the end user rather than the logs.
	pub fn is_user_facing(&self) -> bool {
		matches!(
			self,
			AuthProviderError::InvalidCredential
				| AuthProviderError::Expired
				| AuthProviderError::SignupsDisabled
				| AuthProviderError::Provider(_)
		)
	}
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
	/// Issue a one-time token for `email` and deliver
	/// `redirect_to?token=<t>&type=magiclink`.
	async fn send_magic_link(
		&self,
		email: &str,
		redirect_to: &str,
		create_user: bool,
	) -> Result<(), AuthProviderError>;

	/// Consume a one-time token and open a session for its owner.
	async fn verify_one_time_token(
		&self,
		token: &str,
		token_type: OneTimeTokenType,
	) -> Result<ProviderSession, AuthProviderError>;

	/// Exchange an OAuth authorization code for a session.
	async fn exchange_code_for_session(
		&self,
		code: &str,
	) -> Result<ProviderSession, AuthProviderError>;

	/// Identity behind a session token, or `None` when it is unknown or expired.
	async fn get_current_session(
		&self,
		session_token: &str,
	) -> Result<Option<Identity>, AuthProviderError>;

	async fn sign_out(&self, session_token: &str) -> Result<(), AuthProviderError>;
}
