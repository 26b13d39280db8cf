// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Magic link tokens for passwordless sign-in.
//!
//! A link is a random 32-byte token, hex encoded, delivered to the user as the
//! `token` query parameter of a URL. Only an Argon2id hash of the token is kept.
//! Links are single-use and expire after [`MAGIC_LINK_EXPIRY_MINUTES`]; issuing a
//! new link for an address is expected to invalidate the older ones at the
//! storage layer.

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
#[cfg(test)]
use argon2::{Algorithm, Params, Version};
use chrono::{DateTime, Duration, Utc};
use guild_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;
use uuid::Uuid;

pub const MAGIC_LINK_EXPIRY_MINUTES: i64 = 10;

pub const MAGIC_LINK_TOKEN_BYTES: usize = 32;

/// Value of the `type` query parameter carried by every delivered link.
pub const MAGIC_LINK_TYPE: &str = "magiclink";

#[derive(Debug, thiserror::Error)]
pub enum MagicLinkError {
	#[error("failed to hash magic link token: {0}")]
	Hash(String),

	#[error("invalid redirect url '{url}': {source}")]
	InvalidRedirect {
		url: String,
		#[source]
		source: url::ParseError,
	},
}

fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	{
		let params = Params::new(1024, 1, 1, None).expect("valid Argon2 params for tests");
		Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
	}

	#[cfg(not(test))]
	{
		Argon2::default()
	}
}

/// A stored magic link. The plaintext token is never part of this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLink {
	pub id: Uuid,
	/// Lowercased address the link was sent to.
	pub email: String,
	pub token_hash: String,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub used_at: Option<DateTime<Utc>>,
}

/// A freshly issued link together with the token to deliver.
#[derive(Debug)]
pub struct IssuedMagicLink {
	pub link: MagicLink,
	pub token: SecretString,
}

impl MagicLink {
	/// Issue a link for `email`, returning the record to persist and the
	/// plaintext token to deliver.
	#[instrument(name = "magic_link.issue", skip_all, fields(link_id))]
	pub fn issue(email: &str) -> Result<IssuedMagicLink, MagicLinkError> {
		let token = generate_token();
		let token_hash = hash_magic_link_token(&token)?;
		let now = Utc::now();
		let id = Uuid::new_v4();
		tracing::Span::current().record("link_id", tracing::field::display(id));

		let link = Self {
			id,
			email: email.trim().to_lowercase(),
			token_hash,
			created_at: now,
			expires_at: now + Duration::minutes(MAGIC_LINK_EXPIRY_MINUTES),
			used_at: None,
		};
		tracing::debug!(expires_at = %link.expires_at, "issued magic link");

		Ok(IssuedMagicLink {
			link,
			token: SecretString::new(token),
		})
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}

	pub fn is_used(&self) -> bool {
		self.used_at.is_some()
	}

	/// Unused and not yet expired.
	pub fn is_valid(&self) -> bool {
		!self.is_used() && !self.is_expired_at(Utc::now())
	}

	/// Checks only the token; callers decide on expiry and use separately.
	pub fn matches(&self, token: &str) -> bool {
		verify_magic_link_token(token, &self.token_hash)
	}
}

/// Build the URL delivered to the user: `redirect_to?token=<t>&type=magiclink`.
///
/// Existing query parameters on `redirect_to` are preserved.
pub fn magic_link_url(redirect_to: &str, token: &SecretString) -> Result<String, MagicLinkError> {
	let mut url = Url::parse(redirect_to).map_err(|source| MagicLinkError::InvalidRedirect {
		url: redirect_to.to_string(),
		source,
	})?;
	url
		.query_pairs_mut()
		.append_pair("token", token.expose())
		.append_pair("type", MAGIC_LINK_TYPE);
	Ok(url.into())
}

fn generate_token() -> String {
	use rand::Rng;

	let bytes: [u8; MAGIC_LINK_TOKEN_BYTES] = rand::thread_rng().gen();
	hex::encode(bytes)
}

#[instrument(name = "magic_link.hash", skip_all)]
pub fn hash_magic_link_token(token: &str) -> Result<String, MagicLinkError> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(token.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| MagicLinkError::Hash(e.to_string()))
}

/// Malformed hashes verify as `false`.
#[instrument(name = "magic_link.verify", skip_all)]
pub fn verify_magic_link_token(token: &str, hash: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(hash) else {
		return false;
	};
	argon2_instance()
		.verify_password(token.as_bytes(), &parsed)
		.is_ok()
}
