// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request authentication state and session cookie helpers.
//!
//! The server's middleware resolves the session cookie through the configured
//! [`crate::AuthProvider`] and stores an [`AuthContext`] in the request
//! extensions. Cookie values are never logged.

use chrono::{DateTime, Utc};
use http::header::COOKIE;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::types::UserId;
use crate::user::Identity;

/// The identity behind the current request's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
	pub identity: Identity,
}

impl CurrentUser {
	pub fn new(identity: Identity) -> Self {
		Self { identity }
	}

	pub fn id(&self) -> UserId {
		self.identity.id
	}

	pub fn email(&self) -> &str {
		&self.identity.email
	}
}

#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	pub current_user: Option<CurrentUser>,
}

impl AuthContext {
	pub fn unauthenticated() -> Self {
		Self { current_user: None }
	}

	pub fn authenticated(current_user: CurrentUser) -> Self {
		Self {
			current_user: Some(current_user),
		}
	}

	pub fn is_authenticated(&self) -> bool {
		self.current_user.is_some()
	}

	pub fn user(&self) -> Option<&CurrentUser> {
		self.current_user.as_ref()
	}

	pub fn require_user(&self) -> Result<&CurrentUser, AuthRequired> {
		self.current_user.as_ref().ok_or(AuthRequired)
	}
}

/// Authentication was required but the request carried no valid session.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("authentication required")]
pub struct AuthRequired;

/// Find `cookie_name` in the `Cookie` header. Empty values count as absent.
pub fn extract_session_cookie_with_name(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(';'))
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			(name == cookie_name && !value.is_empty()).then(|| value.to_string())
		})
}

/// Attributes shared by every session cookie the server sets.
#[derive(Debug, Clone)]
pub struct SessionCookie {
	pub name: String,
	pub secure: bool,
}

impl SessionCookie {
	pub fn new(name: impl Into<String>, secure: bool) -> Self {
		Self {
			name: name.into(),
			secure,
		}
	}

	/// `Set-Cookie` value for a session ending at `expires_at`.
	pub fn issue(&self, token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
		let max_age = (expires_at - now).num_seconds().max(0);
		self.render(token, max_age)
	}

	/// `Set-Cookie` value that removes the session cookie.
	pub fn clear(&self) -> String {
		self.render("", 0)
	}

	fn render(&self, value: &str, max_age: i64) -> String {
		let secure = if self.secure { "; Secure" } else { "" };
		format!(
			"{}={}; Path=/; Max-Age={}; HttpOnly{}; SameSite=Lax",
			self.name, value, max_age, secure
		)
	}
}
