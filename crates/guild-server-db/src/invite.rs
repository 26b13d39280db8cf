// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invite repository.
//!
//! Invites are looked up by the SHA-256 digest of their token. Acceptance runs
//! as a single transaction that first takes SQLite's write lock, so two
//! concurrent acceptances for the same user and organization serialize: one
//! inserts the membership, the other observes it and reports `already_member`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use guild_server_auth::{
	hash_token, normalize_email, InviteId, InviteStatus, OrgId, OrgInvite, OrgRole, UserId,
};
use serde::Serialize;
use sqlx::{sqlite::SqlitePool, Row, Sqlite, Transaction};

use crate::error::DbError;
use crate::row::{parse_col, parse_opt_ts, parse_ts, ts};

const INVITE_COLUMNS: &str = "i.id, i.organization_id, i.email, i.role, i.token_hash, i.status, \
	i.invited_by, i.expires_at, i.created_at, i.accepted_at, i.accepted_by";

/// An invite together with the name of its organization.
#[derive(Debug, Clone)]
pub struct InviteDetails {
	pub invite: OrgInvite,
	pub organization_name: String,
}

/// A newly created invite and the plaintext token to share. The token is not
/// recoverable later.
#[derive(Debug, Clone)]
pub struct CreatedInvite {
	pub invite: OrgInvite,
	pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcceptedInvite {
	pub organization_id: OrgId,
	pub already_member: bool,
}

/// One invite accepted on the user's behalf by [`InviteStore::check_pending_invites`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoAcceptedInvite {
	pub organization_id: OrgId,
	pub organization_name: String,
	pub role: OrgRole,
}

#[async_trait]
pub trait InviteStore: Send + Sync {
	async fn create_invite(
		&self,
		org_id: &OrgId,
		email: &str,
		role: OrgRole,
		invited_by: &UserId,
		expiry: Duration,
	) -> Result<CreatedInvite, DbError>;
	async fn get_invite_by_token(&self, token: &str) -> Result<Option<InviteDetails>, DbError>;
	async fn accept_invite(
		&self,
		token: &str,
		user_id: &UserId,
		email: &str,
	) -> Result<AcceptedInvite, DbError>;
	async fn list_pending_invites(&self, org_id: &OrgId) -> Result<Vec<OrgInvite>, DbError>;
	async fn check_pending_invites(
		&self,
		user_id: &UserId,
		email: &str,
	) -> Result<Vec<AutoAcceptedInvite>, DbError>;
	async fn revoke_invite(
		&self,
		org_id: &OrgId,
		invite_id: &InviteId,
		actor: &UserId,
	) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct InviteRepository {
	pool: SqlitePool,
}

impl InviteRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a pending invite.
	///
	/// The actor must be an owner or admin, and only owners may invite owners.
	/// Existing members and addresses with a live pending invite are rejected
	/// as conflicts.
	#[tracing::instrument(skip(self, email), fields(org_id = %org_id, invited_by = %invited_by, role = %role))]
	pub async fn create_invite(
		&self,
		org_id: &OrgId,
		email: &str,
		role: OrgRole,
		invited_by: &UserId,
		expiry: Duration,
	) -> Result<CreatedInvite, DbError> {
		let email = normalize_email(email);
		let now = Utc::now();
		let mut tx = self.pool.begin().await?;

		let actor_role = member_role(&mut tx, org_id, invited_by).await?;
		match actor_role {
			Some(actor) if actor.can_invite_as(role) => {}
			Some(actor) if actor.can_manage() => {
				return Err(DbError::Forbidden(
					"Only owners can invite owners".to_string(),
				));
			}
			_ => {
				return Err(DbError::Forbidden(
					"Only owners and admins can invite members".to_string(),
				));
			}
		}

		let already_member: Option<i64> = sqlx::query_scalar(
			r#"
			SELECT 1 FROM organization_members m
			INNER JOIN user_profiles p ON p.id = m.user_id
			WHERE m.organization_id = ? AND p.email = ?
			LIMIT 1
			"#,
		)
		.bind(org_id.to_string())
		.bind(&email)
		.fetch_optional(&mut *tx)
		.await?;
		if already_member.is_some() {
			return Err(DbError::Conflict(
				"User is already a member of this organization".to_string(),
			));
		}

		let pending: Option<i64> = sqlx::query_scalar(
			r#"
			SELECT 1 FROM organization_invites
			WHERE organization_id = ? AND email = ? AND status = 'pending' AND expires_at > ?
			LIMIT 1
			"#,
		)
		.bind(org_id.to_string())
		.bind(&email)
		.bind(ts(now))
		.fetch_optional(&mut *tx)
		.await?;
		if pending.is_some() {
			return Err(DbError::Conflict(
				"An invite is already pending for this email".to_string(),
			));
		}

		let (invite, token) = OrgInvite::new(*org_id, &email, role, *invited_by, expiry);
		sqlx::query(
			r#"
			INSERT INTO organization_invites
				(id, organization_id, email, role, token_hash, status, invited_by, expires_at, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(invite.id.to_string())
		.bind(invite.org_id.to_string())
		.bind(&invite.email)
		.bind(invite.role.as_str())
		.bind(&invite.token_hash)
		.bind(invite.status.as_str())
		.bind(invite.invited_by.to_string())
		.bind(ts(invite.expires_at))
		.bind(ts(invite.created_at))
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		tracing::info!(invite_id = %invite.id, expires_at = %invite.expires_at, "invite created");
		Ok(CreatedInvite { invite, token })
	}

	#[tracing::instrument(skip(self, token))]
	pub async fn get_invite_by_token(&self, token: &str) -> Result<Option<InviteDetails>, DbError> {
		let row = sqlx::query(&format!(
			"SELECT {INVITE_COLUMNS}, o.name AS organization_name \
			 FROM organization_invites i \
			 INNER JOIN organizations o ON o.id = i.organization_id \
			 WHERE i.token_hash = ?"
		))
		.bind(hash_token(token))
		.fetch_optional(&self.pool)
		.await?;

		let details = row
			.map(|r| {
				Ok::<_, DbError>(InviteDetails {
					invite: row_to_invite(&r)?,
					organization_name: r.get("organization_name"),
				})
			})
			.transpose()?;
		if let Some(ref d) = details {
			tracing::debug!(invite_id = %d.invite.id, org_id = %d.invite.org_id, "invite found by token");
		}
		Ok(details)
	}

	/// Accept the invite behind `token` for the identity (`user_id`, `email`).
	#[tracing::instrument(skip(self, token, email), fields(user_id = %user_id))]
	pub async fn accept_invite(
		&self,
		token: &str,
		user_id: &UserId,
		email: &str,
	) -> Result<AcceptedInvite, DbError> {
		self
			.accept_by_hash(&hash_token(token), user_id, email, Utc::now())
			.await
	}

	async fn accept_by_hash(
		&self,
		token_hash: &str,
		user_id: &UserId,
		email: &str,
		now: DateTime<Utc>,
	) -> Result<AcceptedInvite, DbError> {
		let mut tx = self.pool.begin().await?;

		// A write as the first statement takes the database write lock before
		// anything is read, so the checks below see a stable snapshot.
		sqlx::query("UPDATE organization_invites SET token_hash = token_hash WHERE token_hash = ?")
			.bind(token_hash)
			.execute(&mut *tx)
			.await?;

		let row = sqlx::query(&format!(
			"SELECT {INVITE_COLUMNS} FROM organization_invites i WHERE i.token_hash = ?"
		))
		.bind(token_hash)
		.fetch_optional(&mut *tx)
		.await?;
		let Some(row) = row else {
			return Err(DbError::NotFound("Invite not found".to_string()));
		};
		let invite = row_to_invite(&row)?;

		if invite.is_expired_at(now) {
			return Err(DbError::NotFound("Invite not found or expired".to_string()));
		}
		if !invite.is_addressed_to(email) {
			tracing::warn!(invite_id = %invite.id, org_id = %invite.org_id, "invite email mismatch");
			return Err(DbError::Forbidden(
				"This invite was sent to a different email address".to_string(),
			));
		}

		let existing = member_role(&mut tx, &invite.org_id, user_id).await?;
		let already_member = if existing.is_some() {
			true
		} else {
			if !invite.status.is_pending() {
				return Err(DbError::Conflict(format!(
					"Invite has already been {}",
					invite.status
				)));
			}
			let inserted = sqlx::query(
				r#"
				INSERT INTO organization_members (organization_id, user_id, role, created_at)
				VALUES (?, ?, ?, ?)
				"#,
			)
			.bind(invite.org_id.to_string())
			.bind(user_id.to_string())
			.bind(invite.role.as_str())
			.bind(ts(now))
			.execute(&mut *tx)
			.await
			.map_err(DbError::from);
			match inserted {
				Ok(_) => false,
				Err(e) if e.is_unique_violation() => true,
				Err(e) => return Err(e),
			}
		};

		if invite.status.is_pending() {
			sqlx::query(
				r#"
				UPDATE organization_invites
				SET status = 'accepted', accepted_at = ?, accepted_by = ?
				WHERE id = ? AND status = 'pending'
				"#,
			)
			.bind(ts(now))
			.bind(user_id.to_string())
			.bind(invite.id.to_string())
			.execute(&mut *tx)
			.await?;
		}
		tx.commit().await?;

		tracing::info!(
			invite_id = %invite.id,
			org_id = %invite.org_id,
			already_member,
			"invite accepted"
		);
		Ok(AcceptedInvite {
			organization_id: invite.org_id,
			already_member,
		})
	}

	/// Pending, unexpired invites of an organization, newest first.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_pending_invites(&self, org_id: &OrgId) -> Result<Vec<OrgInvite>, DbError> {
		let rows = sqlx::query(&format!(
			"SELECT {INVITE_COLUMNS} FROM organization_invites i \
			 WHERE i.organization_id = ? AND i.status = 'pending' AND i.expires_at > ? \
			 ORDER BY i.created_at DESC"
		))
		.bind(org_id.to_string())
		.bind(ts(Utc::now()))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_invite).collect()
	}

	/// Accept every live invite addressed to `email` for organizations the
	/// user has not joined yet. Returns the invites that produced a new
	/// membership.
	#[tracing::instrument(skip(self, email), fields(user_id = %user_id))]
	pub async fn check_pending_invites(
		&self,
		user_id: &UserId,
		email: &str,
	) -> Result<Vec<AutoAcceptedInvite>, DbError> {
		let now = Utc::now();
		let candidates = sqlx::query(
			r#"
			SELECT i.token_hash, i.organization_id, i.role, o.name AS organization_name
			FROM organization_invites i
			INNER JOIN organizations o ON o.id = i.organization_id
			WHERE i.email = ? AND i.status = 'pending' AND i.expires_at > ?
				AND NOT EXISTS (
					SELECT 1 FROM organization_members m
					WHERE m.organization_id = i.organization_id AND m.user_id = ?
				)
			ORDER BY i.created_at ASC
			"#,
		)
		.bind(normalize_email(email))
		.bind(ts(now))
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut accepted = Vec::new();
		for row in &candidates {
			let token_hash: String = row.get("token_hash");
			match self.accept_by_hash(&token_hash, user_id, email, now).await {
				Ok(result) if !result.already_member => accepted.push(AutoAcceptedInvite {
					organization_id: result.organization_id,
					organization_name: row.get("organization_name"),
					role: parse_col(row.get::<&str, _>("role"), "role")?,
				}),
				Ok(_) => {}
				Err(DbError::NotFound(_) | DbError::Conflict(_) | DbError::Forbidden(_)) => {
					tracing::debug!("pending invite no longer acceptable, skipping");
				}
				Err(e) => return Err(e),
			}
		}

		tracing::info!(accepted = accepted.len(), "checked pending invites");
		Ok(accepted)
	}

	/// Revoke a pending invite. Owners and admins only.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, invite_id = %invite_id, actor = %actor))]
	pub async fn revoke_invite(
		&self,
		org_id: &OrgId,
		invite_id: &InviteId,
		actor: &UserId,
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		if !member_role(&mut tx, org_id, actor)
			.await?
			.is_some_and(|r| r.can_manage())
		{
			return Err(DbError::Forbidden(
				"Only owners and admins can revoke invites".to_string(),
			));
		}

		let updated = sqlx::query(
			r#"
			UPDATE organization_invites SET status = 'revoked'
			WHERE id = ? AND organization_id = ? AND status = 'pending'
			"#,
		)
		.bind(invite_id.to_string())
		.bind(org_id.to_string())
		.execute(&mut *tx)
		.await?;

		if updated.rows_affected() == 0 {
			let status: Option<String> = sqlx::query_scalar(
				"SELECT status FROM organization_invites WHERE id = ? AND organization_id = ?",
			)
			.bind(invite_id.to_string())
			.bind(org_id.to_string())
			.fetch_optional(&mut *tx)
			.await?;
			return Err(match status {
				None => DbError::NotFound("Invite not found".to_string()),
				Some(status) => DbError::Conflict(format!("Invite has already been {status}")),
			});
		}
		tx.commit().await?;

		tracing::info!("invite revoked");
		Ok(())
	}
}

async fn member_role(
	tx: &mut Transaction<'_, Sqlite>,
	org_id: &OrgId,
	user_id: &UserId,
) -> Result<Option<OrgRole>, DbError> {
	let role: Option<String> = sqlx::query_scalar(
		"SELECT role FROM organization_members WHERE organization_id = ? AND user_id = ?",
	)
	.bind(org_id.to_string())
	.bind(user_id.to_string())
	.fetch_optional(&mut **tx)
	.await?;
	role.map(|r| parse_col(&r, "role")).transpose()
}

fn row_to_invite(row: &sqlx::sqlite::SqliteRow) -> Result<OrgInvite, DbError> {
	let status: InviteStatus = parse_col(row.get::<&str, _>("status"), "status")?;
	let accepted_by: Option<String> = row.get("accepted_by");

	Ok(OrgInvite {
		id: parse_col(row.get::<&str, _>("id"), "invite id")?,
		org_id: parse_col(row.get::<&str, _>("organization_id"), "organization_id")?,
		email: row.get("email"),
		role: parse_col(row.get::<&str, _>("role"), "role")?,
		token_hash: row.get("token_hash"),
		status,
		invited_by: parse_col(row.get::<&str, _>("invited_by"), "invited_by")?,
		expires_at: parse_ts(row.get::<&str, _>("expires_at"), "expires_at")?,
		created_at: parse_ts(row.get::<&str, _>("created_at"), "created_at")?,
		accepted_at: parse_opt_ts(row.get("accepted_at"), "accepted_at")?,
		accepted_by: accepted_by
			.map(|id| parse_col(&id, "accepted_by"))
			.transpose()?,
	})
}

#[async_trait]
impl InviteStore for InviteRepository {
	async fn create_invite(
		&self,
		org_id: &OrgId,
		email: &str,
		role: OrgRole,
		invited_by: &UserId,
		expiry: Duration,
	) -> Result<CreatedInvite, DbError> {
		self
			.create_invite(org_id, email, role, invited_by, expiry)
			.await
	}

	async fn get_invite_by_token(&self, token: &str) -> Result<Option<InviteDetails>, DbError> {
		self.get_invite_by_token(token).await
	}

	async fn accept_invite(
		&self,
		token: &str,
		user_id: &UserId,
		email: &str,
	) -> Result<AcceptedInvite, DbError> {
		self.accept_invite(token, user_id, email).await
	}

	async fn list_pending_invites(&self, org_id: &OrgId) -> Result<Vec<OrgInvite>, DbError> {
		self.list_pending_invites(org_id).await
	}

	async fn check_pending_invites(
		&self,
		user_id: &UserId,
		email: &str,
	) -> Result<Vec<AutoAcceptedInvite>, DbError> {
		self.check_pending_invites(user_id, email).await
	}

	async fn revoke_invite(
		&self,
		org_id: &OrgId,
		invite_id: &InviteId,
		actor: &UserId,
	) -> Result<(), DbError> {
		self.revoke_invite(org_id, invite_id, actor).await
	}
}
