// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hosted auth provider for Guild.
//!
//! Talks to a GoTrue-compatible auth service over HTTP:
//!
//! | Operation | Endpoint |
//! |---|---|
//! | send magic link | `POST /auth/v1/otp?redirect_to=...` |
//! | verify one-time token | `POST /auth/v1/verify` |
//! | exchange OAuth code | `POST /auth/v1/token?grant_type=pkce` |
//! | current session | `GET /auth/v1/user` |
//! | sign out | `POST /auth/v1/logout` |
//!
//! Every request carries the project API key in the `apikey` header. Session
//! calls additionally send the user's access token as a bearer token; that
//! access token is what Guild stores in its session cookie.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use guild_common_secret::SecretString;
use guild_server_auth::{
	AuthProvider, AuthProviderError, Identity, OneTimeTokenType, ProviderSession, UserId,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Fallback session lifetime when the service omits `expires_in`.
const DEFAULT_SESSION_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
	email: &'a str,
	create_user: bool,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
	#[serde(rename = "type")]
	token_type: &'a str,
	token_hash: &'a str,
}

#[derive(Debug, Serialize)]
struct PkceRequest<'a> {
	auth_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct HostedUser {
	id: String,
	#[serde(default)]
	email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostedSession {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	expires_at: Option<i64>,
	user: HostedUser,
}

/// Error body. Newer services send `error_code`/`msg`, older ones
/// `error`/`error_description`.
#[derive(Debug, Default, Deserialize)]
struct HostedErrorBody {
	#[serde(default)]
	error_code: Option<String>,
	#[serde(default)]
	msg: Option<String>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

impl HostedErrorBody {
	fn code(&self) -> Option<&str> {
		self.error_code.as_deref().or(self.error.as_deref())
	}

	fn message(&self) -> Option<&str> {
		self
			.msg
			.as_deref()
			.or(self.message.as_deref())
			.or(self.error_description.as_deref())
	}
}

/// [`AuthProvider`] backed by a hosted GoTrue-compatible service.
#[derive(Debug, Clone)]
pub struct HostedAuthProvider {
	base_url: Url,
	api_key: SecretString,
	http_client: reqwest::Client,
}

impl HostedAuthProvider {
	/// `base_url` is the service root, e.g. `https://project.example.co`.
	#[tracing::instrument(skip_all, name = "HostedAuthProvider::new")]
	pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, AuthProviderError> {
		let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
			.map_err(|e| AuthProviderError::Http(format!("invalid auth service url: {e}")))?;
		let http_client = reqwest::Client::builder()
			.user_agent(concat!("guild-server/", env!("CARGO_PKG_VERSION")))
			.timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
			.build()
			.map_err(|e| AuthProviderError::Http(e.to_string()))?;

		Ok(Self {
			base_url,
			api_key,
			http_client,
		})
	}

	fn endpoint(&self, path: &str) -> Result<Url, AuthProviderError> {
		self
			.base_url
			.join(path)
			.map_err(|e| AuthProviderError::Http(format!("invalid auth service url: {e}")))
	}

	fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
		self
			.http_client
			.request(method, url)
			.header("apikey", self.api_key.expose().as_str())
			.header("Accept", "application/json")
	}

	async fn send_json<T: serde::de::DeserializeOwned>(
		&self,
		builder: reqwest::RequestBuilder,
		on_unauthorized: AuthProviderError,
	) -> Result<T, AuthProviderError> {
		let response = builder.send().await.map_err(http_error)?;
		let status = response.status();
		if status.is_success() {
			return response
				.json()
				.await
				.map_err(|e| AuthProviderError::Http(format!("invalid response body: {e}")));
		}
		let body = response.text().await.unwrap_or_default();
		Err(map_error(status, &body, on_unauthorized))
	}

	fn session_from(&self, session: HostedSession) -> Result<ProviderSession, AuthProviderError> {
		let identity = identity_from(session.user)?;
		let expires_at = session_expiry(session.expires_at, session.expires_in, Utc::now());
		tracing::info!(user_id = %identity.id, "hosted session established");
		Ok(ProviderSession {
			identity,
			session_token: SecretString::new(session.access_token),
			expires_at,
		})
	}
}

fn http_error(e: reqwest::Error) -> AuthProviderError {
	tracing::error!(error = %e, "auth service request failed");
	AuthProviderError::Http(e.to_string())
}

fn map_error(status: StatusCode, body: &str, on_unauthorized: AuthProviderError) -> AuthProviderError {
	let parsed: HostedErrorBody = serde_json::from_str(body).unwrap_or_default();
	let code = parsed.code().unwrap_or_default();
	let message = parsed.message().unwrap_or_default();

	if code == "otp_expired" {
		return AuthProviderError::Expired;
	}
	if code == "signup_disabled" || message.starts_with("Signups not allowed") {
		return AuthProviderError::SignupsDisabled;
	}
	if status.is_server_error() {
		tracing::error!(status = %status, "auth service error");
		return AuthProviderError::Http(format!("auth service returned {status}"));
	}
	if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
		return on_unauthorized;
	}
	if message.is_empty() {
		AuthProviderError::Provider(format!("auth service returned {status}"))
	} else {
		AuthProviderError::Provider(message.to_string())
	}
}

fn identity_from(user: HostedUser) -> Result<Identity, AuthProviderError> {
	let id: UserId = user
		.id
		.parse()
		.map_err(|e| AuthProviderError::Provider(format!("invalid user id from auth service: {e}")))?;
	let email = user
		.email
		.filter(|e| !e.trim().is_empty())
		.ok_or_else(|| AuthProviderError::Provider("auth service user has no email".to_string()))?;
	Ok(Identity::new(id, &email))
}

fn session_expiry(
	expires_at: Option<i64>,
	expires_in: Option<i64>,
	now: DateTime<Utc>,
) -> DateTime<Utc> {
	if let Some(at) = expires_at.and_then(|secs| Utc.timestamp_opt(secs, 0).single()) {
		return at;
	}
	let after = |secs: i64| Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
	expires_in
		.and_then(after)
		.or_else(|| after(DEFAULT_SESSION_SECS))
		.unwrap_or(now)
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
	#[tracing::instrument(skip(self, email))]
	async fn send_magic_link(
		&self,
		email: &str,
		redirect_to: &str,
		create_user: bool,
	) -> Result<(), AuthProviderError> {
		let mut url = self.endpoint("auth/v1/otp")?;
		url.query_pairs_mut().append_pair("redirect_to", redirect_to);

		let _: serde_json::Value = self
			.send_json(
				self.request(reqwest::Method::POST, url).json(&OtpRequest {
					email,
					create_user,
				}),
				AuthProviderError::Provider("auth service rejected the API key".to_string()),
			)
			.await?;

		tracing::info!("magic link requested from auth service");
		Ok(())
	}

	#[tracing::instrument(skip(self, token))]
	async fn verify_one_time_token(
		&self,
		token: &str,
		token_type: OneTimeTokenType,
	) -> Result<ProviderSession, AuthProviderError> {
		let url = self.endpoint("auth/v1/verify")?;
		let session: HostedSession = self
			.send_json(
				self.request(reqwest::Method::POST, url).json(&VerifyRequest {
					token_type: token_type.as_str(),
					token_hash: token,
				}),
				AuthProviderError::InvalidCredential,
			)
			.await
			.map_err(|e| match e {
				AuthProviderError::Provider(_) => AuthProviderError::InvalidCredential,
				other => other,
			})?;
		self.session_from(session)
	}

	#[tracing::instrument(skip(self, code))]
	async fn exchange_code_for_session(
		&self,
		code: &str,
	) -> Result<ProviderSession, AuthProviderError> {
		let mut url = self.endpoint("auth/v1/token")?;
		url.query_pairs_mut().append_pair("grant_type", "pkce");

		let session: HostedSession = self
			.send_json(
				self
					.request(reqwest::Method::POST, url)
					.json(&PkceRequest { auth_code: code }),
				AuthProviderError::InvalidCredential,
			)
			.await?;
		self.session_from(session)
	}

	#[tracing::instrument(skip(self, session_token))]
	async fn get_current_session(
		&self,
		session_token: &str,
	) -> Result<Option<Identity>, AuthProviderError> {
		let url = self.endpoint("auth/v1/user")?;
		let result: Result<HostedUser, _> = self
			.send_json(
				self
					.request(reqwest::Method::GET, url)
					.bearer_auth(session_token),
				AuthProviderError::InvalidCredential,
			)
			.await;

		match result {
			Ok(user) => identity_from(user).map(Some),
			Err(AuthProviderError::InvalidCredential | AuthProviderError::Expired) => Ok(None),
			Err(e) => Err(e),
		}
	}

	#[tracing::instrument(skip(self, session_token))]
	async fn sign_out(&self, session_token: &str) -> Result<(), AuthProviderError> {
		let url = self.endpoint("auth/v1/logout")?;
		let response = self
			.request(reqwest::Method::POST, url)
			.bearer_auth(session_token)
			.send()
			.await
			.map_err(http_error)?;

		let status = response.status();
		if status.is_success() || status == StatusCode::UNAUTHORIZED {
			return Ok(());
		}
		let body = response.text().await.unwrap_or_default();
		Err(map_error(status, &body, AuthProviderError::InvalidCredential))
	}
}
