// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and magic-link storage for the built-in auth provider.
//!
//! Session tokens are stored as SHA-256 digests and looked up directly.
//! Magic-link tokens are Argon2id hashes, which cannot be looked up, so
//! verification scans the pending links and then claims the match with a
//! conditional update. Only one caller can claim a given link.

use async_trait::async_trait;
use chrono::Utc;
use guild_server_auth::{magic_link::MagicLink, Identity, Session};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::identity::row_to_identity;
use crate::row::{parse_col, parse_opt_ts, parse_ts, ts};

#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn create_session(&self, session: &Session) -> Result<(), DbError>;
	async fn get_session_identity(&self, token_hash: &str) -> Result<Option<Identity>, DbError>;
	async fn delete_session(&self, token_hash: &str) -> Result<bool, DbError>;
	async fn create_magic_link(&self, link: &MagicLink) -> Result<(), DbError>;
	async fn get_pending_magic_links(&self) -> Result<Vec<MagicLink>, DbError>;
	async fn claim_magic_link(&self, link: &MagicLink) -> Result<bool, DbError>;
	async fn invalidate_magic_links_for_email(&self, email: &str) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, session), fields(session_id = %session.id, user_id = %session.user_id))]
	pub async fn create_session(&self, session: &Session) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO auth_sessions (id, user_id, token_hash, created_at, expires_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(session.id.to_string())
		.bind(session.user_id.to_string())
		.bind(&session.token_hash)
		.bind(ts(session.created_at))
		.bind(ts(session.expires_at))
		.execute(&self.pool)
		.await?;

		tracing::debug!("session created");
		Ok(())
	}

	/// The identity behind an unexpired session.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_session_identity(&self, token_hash: &str) -> Result<Option<Identity>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT u.id, u.email
			FROM auth_sessions s
			INNER JOIN auth_users u ON u.id = s.user_id
			WHERE s.token_hash = ? AND s.expires_at > ?
			"#,
		)
		.bind(token_hash)
		.bind(ts(Utc::now()))
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_identity(&r)).transpose()
	}

	#[tracing::instrument(skip(self, token_hash))]
	pub async fn delete_session(&self, token_hash: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM auth_sessions WHERE token_hash = ?")
			.bind(token_hash)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self, link), fields(magic_link_id = %link.id))]
	pub async fn create_magic_link(&self, link: &MagicLink) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO magic_links (id, email, token_hash, created_at, expires_at, used_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(link.id.to_string())
		.bind(&link.email)
		.bind(&link.token_hash)
		.bind(ts(link.created_at))
		.bind(ts(link.expires_at))
		.bind(link.used_at.map(ts))
		.execute(&self.pool)
		.await?;

		tracing::debug!("magic link created");
		Ok(())
	}

	/// Unused, unexpired links, for Argon2 verification.
	#[tracing::instrument(skip(self))]
	pub async fn get_pending_magic_links(&self) -> Result<Vec<MagicLink>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, email, token_hash, created_at, expires_at, used_at
			FROM magic_links
			WHERE used_at IS NULL AND expires_at > ?
			"#,
		)
		.bind(ts(Utc::now()))
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|r| {
				Ok::<_, DbError>(MagicLink {
					id: parse_col(r.get::<&str, _>("id"), "magic link id")?,
					email: r.get("email"),
					token_hash: r.get("token_hash"),
					created_at: parse_ts(r.get::<&str, _>("created_at"), "created_at")?,
					expires_at: parse_ts(r.get::<&str, _>("expires_at"), "expires_at")?,
					used_at: parse_opt_ts(r.get("used_at"), "used_at")?,
				})
			})
			.collect()
	}

	/// Mark `link` used. Returns `false` when it was already used or has expired.
	#[tracing::instrument(skip(self, link), fields(magic_link_id = %link.id))]
	pub async fn claim_magic_link(&self, link: &MagicLink) -> Result<bool, DbError> {
		let now = ts(Utc::now());
		let result = sqlx::query(
			r#"
			UPDATE magic_links
			SET used_at = ?
			WHERE id = ? AND used_at IS NULL AND expires_at > ?
			"#,
		)
		.bind(&now)
		.bind(link.id.to_string())
		.bind(&now)
		.execute(&self.pool)
		.await?;

		let claimed = result.rows_affected() > 0;
		tracing::debug!(claimed, "magic link claim");
		Ok(claimed)
	}

	/// Burn every outstanding link for `email`. Called before issuing a new one.
	#[tracing::instrument(skip(self, email))]
	pub async fn invalidate_magic_links_for_email(&self, email: &str) -> Result<(), DbError> {
		sqlx::query("UPDATE magic_links SET used_at = ? WHERE email = ? AND used_at IS NULL")
			.bind(ts(Utc::now()))
			.bind(email)
			.execute(&self.pool)
			.await?;

		tracing::debug!("invalidated magic links for email");
		Ok(())
	}
}

#[async_trait]
impl SessionStore for SessionRepository {
	async fn create_session(&self, session: &Session) -> Result<(), DbError> {
		self.create_session(session).await
	}

	async fn get_session_identity(&self, token_hash: &str) -> Result<Option<Identity>, DbError> {
		self.get_session_identity(token_hash).await
	}

	async fn delete_session(&self, token_hash: &str) -> Result<bool, DbError> {
		self.delete_session(token_hash).await
	}

	async fn create_magic_link(&self, link: &MagicLink) -> Result<(), DbError> {
		self.create_magic_link(link).await
	}

	async fn get_pending_magic_links(&self) -> Result<Vec<MagicLink>, DbError> {
		self.get_pending_magic_links().await
	}

	async fn claim_magic_link(&self, link: &MagicLink) -> Result<bool, DbError> {
		self.claim_magic_link(link).await
	}

	async fn invalidate_magic_links_for_email(&self, email: &str) -> Result<(), DbError> {
		self.invalidate_magic_links_for_email(email).await
	}
}
