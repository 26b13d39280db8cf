// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users known to the built-in auth provider.

use async_trait::async_trait;
use chrono::Utc;
use guild_server_auth::{normalize_email, Identity, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{parse_col, ts};

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn find_or_create_user(&self, email: &str) -> Result<Identity, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<Identity>, DbError>;
}

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Return the user for `email`, creating one on first sign-in.
	#[tracing::instrument(skip(self, email))]
	pub async fn find_or_create_user(&self, email: &str) -> Result<Identity, DbError> {
		let email = normalize_email(email);
		let id = UserId::generate();

		let inserted = sqlx::query(
			r#"
			INSERT INTO auth_users (id, email, created_at)
			VALUES (?, ?, ?)
			ON CONFLICT(email) DO NOTHING
			"#,
		)
		.bind(id.to_string())
		.bind(&email)
		.bind(ts(Utc::now()))
		.execute(&self.pool)
		.await?;

		if inserted.rows_affected() > 0 {
			tracing::info!(user_id = %id, "user created");
		}

		self
			.get_user_by_email(&email)
			.await?
			.ok_or_else(|| DbError::Internal("user vanished after upsert".to_string()))
	}

	#[tracing::instrument(skip(self, email))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, DbError> {
		let row = sqlx::query("SELECT id, email FROM auth_users WHERE email = ?")
			.bind(normalize_email(email))
			.fetch_optional(&self.pool)
			.await?;
		row.map(|r| row_to_identity(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<Identity>, DbError> {
		let row = sqlx::query("SELECT id, email FROM auth_users WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		row.map(|r| row_to_identity(&r)).transpose()
	}
}

pub(crate) fn row_to_identity(row: &sqlx::sqlite::SqliteRow) -> Result<Identity, DbError> {
	let id: UserId = parse_col(row.get::<&str, _>("id"), "user id")?;
	Ok(Identity::new(id, row.get::<&str, _>("email")))
}

#[async_trait]
impl UserStore for UserRepository {
	async fn find_or_create_user(&self, email: &str) -> Result<Identity, DbError> {
		self.find_or_create_user(email).await
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, DbError> {
		self.get_user_by_email(email).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<Identity>, DbError> {
		self.get_user_by_id(id).await
	}
}
