// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Locally issued browser sessions.
//!
//! The cookie carries a random 32-byte token; the database keeps only its
//! SHA-256 digest.

use chrono::{DateTime, Duration, Utc};
use guild_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::types::{SessionId, UserId};

pub const SESSION_EXPIRY_DAYS: i64 = 30;

pub const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionId,
	pub user_id: UserId,
	pub token_hash: String,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl Session {
	/// Start a session for `user_id`, returning it with the plaintext cookie token.
	#[instrument(level = "debug", skip(user_id), fields(user_id = %user_id))]
	pub fn start(user_id: UserId) -> (Self, SecretString) {
		let token = generate_session_token();
		let now = Utc::now();
		let session = Self {
			id: SessionId::generate(),
			user_id,
			token_hash: crate::hash_token(token.expose()),
			created_at: now,
			expires_at: now + Duration::days(SESSION_EXPIRY_DAYS),
		};
		(session, token)
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}
}

pub fn generate_session_token() -> SecretString {
	use rand::Rng;

	let bytes: [u8; SESSION_TOKEN_BYTES] = rand::thread_rng().gen();
	SecretString::new(hex::encode(bytes))
}
