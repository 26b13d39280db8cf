// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Embedded schema migrations. Every statement is idempotent, so running the
//! full set on each start is safe.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_organizations",
		include_str!("../migrations/001_organizations.sql"),
	),
	(
		"002_organization_invites",
		include_str!("../migrations/002_organization_invites.sql"),
	),
	(
		"003_user_profiles",
		include_str!("../migrations/003_user_profiles.sql"),
	),
	("004_local_auth", include_str!("../migrations/004_local_auth.sql")),
];

#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in statements(sql) {
			if let Err(e) = sqlx::query(stmt).execute(pool).await {
				let msg = e.to_string();
				if !msg.contains("already exists") && !msg.contains("duplicate column") {
					tracing::error!(migration = *name, error = %e, "migration failed");
					return Err(e.into());
				}
			}
		}
		tracing::debug!(migration = *name, "migration applied");
	}
	Ok(())
}

/// Split a script on `;`, dropping comment-only and empty fragments.
fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').filter(|stmt| {
		stmt
			.lines()
			.map(str::trim)
			.any(|line| !line.is_empty() && !line.starts_with("--"))
	})
}
