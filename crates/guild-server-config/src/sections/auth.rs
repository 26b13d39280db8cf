// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication settings: which identity provider backs sessions, and how
//! the session cookie is issued.

use std::fmt;
use std::str::FromStr;

use guild_common_config::SecretString;
use serde::Deserialize;

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "guild_session";

/// Identity provider behind magic links and sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
	/// Built-in provider backed by the server's own database.
	#[default]
	Local,
	/// GoTrue-compatible hosted auth service.
	Hosted,
}

impl fmt::Display for AuthProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuthProviderKind::Local => write!(f, "local"),
			AuthProviderKind::Hosted => write!(f, "hosted"),
		}
	}
}

impl FromStr for AuthProviderKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"local" => Ok(AuthProviderKind::Local),
			"hosted" => Ok(AuthProviderKind::Hosted),
			other => Err(format!("unknown auth provider '{other}' (expected local or hosted)")),
		}
	}
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub provider: AuthProviderKind,
	/// Writes magic links to the log instead of requiring email delivery.
	pub dev_mode: bool,
	pub environment: String,
	pub session_cookie_name: String,
	pub secure_cookies: bool,
	pub signups_disabled: bool,
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub provider: Option<AuthProviderKind>,
	#[serde(default)]
	pub dev_mode: Option<bool>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub session_cookie_name: Option<String>,
	#[serde(default)]
	pub secure_cookies: Option<bool>,
	#[serde(default)]
	pub signups_disabled: Option<bool>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.provider.is_some() {
			self.provider = other.provider;
		}
		if other.dev_mode.is_some() {
			self.dev_mode = other.dev_mode;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.session_cookie_name.is_some() {
			self.session_cookie_name = other.session_cookie_name;
		}
		if other.secure_cookies.is_some() {
			self.secure_cookies = other.secure_cookies;
		}
		if other.signups_disabled.is_some() {
			self.signups_disabled = other.signups_disabled;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			provider: self.provider.unwrap_or_default(),
			dev_mode: self.dev_mode.unwrap_or(false),
			environment: self
				.environment
				.unwrap_or_else(|| "development".to_string()),
			session_cookie_name: self
				.session_cookie_name
				.unwrap_or_else(|| DEFAULT_SESSION_COOKIE_NAME.to_string()),
			secure_cookies: self.secure_cookies.unwrap_or(true),
			signups_disabled: self.signups_disabled.unwrap_or(false),
		}
	}
}

/// Connection details for [`AuthProviderKind::Hosted`].
#[derive(Debug, Clone)]
pub struct HostedAuthConfig {
	pub url: String,
	pub api_key: SecretString,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostedAuthConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub api_key: Option<SecretString>,
}

impl HostedAuthConfigLayer {
	pub fn merge(&mut self, other: HostedAuthConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
	}

	/// Returns `None` unless both the URL and the API key are present.
	pub fn finalize(self) -> Option<HostedAuthConfig> {
		match (self.url, self.api_key) {
			(Some(url), Some(api_key)) if !url.trim().is_empty() && !api_key.is_blank() => {
				Some(HostedAuthConfig {
					url: url.trim_end_matches('/').to_string(),
					api_key,
				})
			}
			_ => None,
		}
	}
}
