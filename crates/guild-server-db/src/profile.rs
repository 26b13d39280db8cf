// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application-side user profiles, keyed by identity id.

use async_trait::async_trait;
use guild_server_auth::{UserId, UserProfile};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{parse_col, parse_ts, ts};

#[async_trait]
pub trait ProfileStore: Send + Sync {
	async fn get_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DbError>;
	async fn create_profile(&self, profile: &UserProfile) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct ProfileRepository {
	pool: SqlitePool,
}

impl ProfileRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, full_name, created_at
			FROM user_profiles
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| {
			Ok::<_, DbError>(UserProfile {
				id: parse_col(r.get::<&str, _>("id"), "profile id")?,
				email: r.get("email"),
				full_name: r.get("full_name"),
				created_at: parse_ts(r.get::<&str, _>("created_at"), "created_at")?,
			})
		})
		.transpose()
	}

	/// Insert a profile. A second insert for the same id is a conflict.
	#[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
	pub async fn create_profile(&self, profile: &UserProfile) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO user_profiles (id, email, full_name, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(profile.id.to_string())
		.bind(&profile.email)
		.bind(&profile.full_name)
		.bind(ts(profile.created_at))
		.execute(&self.pool)
		.await
		.map_err(DbError::from);

		match result {
			Ok(_) => {
				tracing::info!("user profile created");
				Ok(())
			}
			Err(e) if e.is_unique_violation() => {
				Err(DbError::Conflict("Profile already exists".to_string()))
			}
			Err(e) => Err(e),
		}
	}
}

#[async_trait]
impl ProfileStore for ProfileRepository {
	async fn get_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DbError> {
		self.get_profile(id).await
	}

	async fn create_profile(&self, profile: &UserProfile) -> Result<(), DbError> {
		self.create_profile(profile).await
	}
}
