// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	/// The actor lacks the role or identity the operation requires.
	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Internal: {0}")]
	Internal(String),
}

impl DbError {
	/// Message without the variant prefix, suitable for end users.
	pub fn user_message(&self) -> String {
		match self {
			DbError::NotFound(m) | DbError::Conflict(m) | DbError::Forbidden(m) => m.clone(),
			DbError::Sqlx(_) | DbError::Internal(_) => {
				"An unexpected database error occurred".to_string()
			}
		}
	}

	pub(crate) fn is_unique_violation(&self) -> bool {
		match self {
			DbError::Sqlx(e) => e
				.as_database_error()
				.is_some_and(|db| db.is_unique_violation()),
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
