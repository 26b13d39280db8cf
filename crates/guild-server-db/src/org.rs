// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization repository: organizations, memberships and member listings.

use async_trait::async_trait;
use chrono::Utc;
use guild_server_auth::{
	OrgId, OrgMembership, OrgRole, Organization, TeamMember, UserId, UserOrganization, UserProfile,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{parse_col, parse_ts, ts};

#[async_trait]
pub trait OrgStore: Send + Sync {
	async fn create_organization(&self, name: &str, owner: &UserId)
		-> Result<Organization, DbError>;
	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError>;
	async fn update_organization(
		&self,
		org_id: &OrgId,
		name: &str,
		actor: &UserId,
	) -> Result<Organization, DbError>;
	async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError>;
	async fn list_user_organizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<UserOrganization>, DbError>;
	async fn list_members(&self, org_id: &OrgId) -> Result<Vec<TeamMember>, DbError>;
}

/// Repository for organizations and their memberships.
#[derive(Clone)]
pub struct OrgRepository {
	pool: SqlitePool,
}

impl OrgRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create an organization and make `owner` its owner in one transaction.
	#[tracing::instrument(skip(self, name), fields(owner = %owner, org_id))]
	pub async fn create_organization(
		&self,
		name: &str,
		owner: &UserId,
	) -> Result<Organization, DbError> {
		let org = Organization::new(name, *owner);
		tracing::Span::current().record("org_id", tracing::field::display(org.id));

		let mut tx = self.pool.begin().await?;
		sqlx::query(
			r#"
			INSERT INTO organizations (id, name, created_by, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(org.id.to_string())
		.bind(&org.name)
		.bind(org.created_by.to_string())
		.bind(ts(org.created_at))
		.bind(ts(org.updated_at))
		.execute(&mut *tx)
		.await?;

		sqlx::query(
			r#"
			INSERT INTO organization_members (organization_id, user_id, role, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(org.id.to_string())
		.bind(owner.to_string())
		.bind(OrgRole::Owner.as_str())
		.bind(ts(org.created_at))
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		tracing::info!(org_id = %org.id, "organization created");
		Ok(org)
	}

	#[tracing::instrument(skip(self), fields(org_id = %id))]
	pub async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, created_by, created_at, updated_at
			FROM organizations
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_org(&r)).transpose()
	}

	/// Rename an organization. Only owners and admins may do this.
	#[tracing::instrument(skip(self, name), fields(org_id = %org_id, actor = %actor))]
	pub async fn update_organization(
		&self,
		org_id: &OrgId,
		name: &str,
		actor: &UserId,
	) -> Result<Organization, DbError> {
		let mut tx = self.pool.begin().await?;

		let role: Option<String> = sqlx::query_scalar(
			"SELECT role FROM organization_members WHERE organization_id = ? AND user_id = ?",
		)
		.bind(org_id.to_string())
		.bind(actor.to_string())
		.fetch_optional(&mut *tx)
		.await?;
		let role: Option<OrgRole> = role.map(|r| parse_col(&r, "role")).transpose()?;
		if !role.is_some_and(|r| r.can_manage()) {
			return Err(DbError::Forbidden(
				"Only owners and admins can update the organization".to_string(),
			));
		}

		let updated = sqlx::query("UPDATE organizations SET name = ?, updated_at = ? WHERE id = ?")
			.bind(name)
			.bind(ts(Utc::now()))
			.bind(org_id.to_string())
			.execute(&mut *tx)
			.await?;
		if updated.rows_affected() == 0 {
			return Err(DbError::NotFound("Organization not found".to_string()));
		}

		let row = sqlx::query(
			"SELECT id, name, created_by, created_at, updated_at FROM organizations WHERE id = ?",
		)
		.bind(org_id.to_string())
		.fetch_one(&mut *tx)
		.await?;
		let org = row_to_org(&row)?;
		tx.commit().await?;

		tracing::info!(org_id = %org_id, "organization renamed");
		Ok(org)
	}

	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT organization_id, user_id, role, created_at
			FROM organization_members
			WHERE organization_id = ? AND user_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row
			.map(|r| {
				Ok::<_, DbError>(OrgMembership {
					org_id: parse_col(r.get::<&str, _>("organization_id"), "organization_id")?,
					user_id: parse_col(r.get::<&str, _>("user_id"), "user_id")?,
					role: parse_col(r.get::<&str, _>("role"), "role")?,
					created_at: parse_ts(r.get::<&str, _>("created_at"), "created_at")?,
				})
			})
			.transpose()
	}

	/// A user's organizations, oldest membership first.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn list_user_organizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<UserOrganization>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT m.role AS member_role, m.created_at AS joined_at,
				o.id, o.name, o.created_by, o.created_at, o.updated_at
			FROM organization_members m
			INNER JOIN organizations o ON o.id = m.organization_id
			WHERE m.user_id = ?
			ORDER BY m.created_at ASC, o.name ASC
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|r| {
				Ok::<_, DbError>(UserOrganization {
					role: parse_col(r.get::<&str, _>("member_role"), "role")?,
					joined_at: parse_ts(r.get::<&str, _>("joined_at"), "joined_at")?,
					organization: row_to_org(r)?,
				})
			})
			.collect()
	}

	/// Members of an organization ordered by join time, with their profiles.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_members(&self, org_id: &OrgId) -> Result<Vec<TeamMember>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT m.user_id, m.role, m.created_at,
				p.id AS profile_id, p.email AS profile_email, p.full_name AS profile_full_name,
				p.created_at AS profile_created_at
			FROM organization_members m
			LEFT JOIN user_profiles p ON p.id = m.user_id
			WHERE m.organization_id = ?
			ORDER BY m.created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let members = rows
			.iter()
			.map(|r| {
				let user_id: UserId = parse_col(r.get::<&str, _>("user_id"), "user_id")?;
				let profile = match r.get::<Option<String>, _>("profile_id") {
					Some(_) => Some(UserProfile {
						id: user_id,
						email: r.get("profile_email"),
						full_name: r.get("profile_full_name"),
						created_at: parse_ts(
							r.get::<&str, _>("profile_created_at"),
							"profile created_at",
						)?,
					}),
					None => None,
				};
				Ok(TeamMember {
					user_id,
					role: parse_col(r.get::<&str, _>("role"), "role")?,
					created_at: parse_ts(r.get::<&str, _>("created_at"), "created_at")?,
					profile,
				})
			})
			.collect::<Result<Vec<_>, DbError>>()?;

		tracing::debug!(count = members.len(), "listed organization members");
		Ok(members)
	}
}

pub(crate) fn row_to_org(row: &sqlx::sqlite::SqliteRow) -> Result<Organization, DbError> {
	Ok(Organization {
		id: parse_col(row.get::<&str, _>("id"), "organization id")?,
		name: row.get("name"),
		created_by: parse_col(row.get::<&str, _>("created_by"), "created_by")?,
		created_at: parse_ts(row.get::<&str, _>("created_at"), "created_at")?,
		updated_at: parse_ts(row.get::<&str, _>("updated_at"), "updated_at")?,
	})
}

#[async_trait]
impl OrgStore for OrgRepository {
	async fn create_organization(
		&self,
		name: &str,
		owner: &UserId,
	) -> Result<Organization, DbError> {
		self.create_organization(name, owner).await
	}

	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		self.get_org_by_id(id).await
	}

	async fn update_organization(
		&self,
		org_id: &OrgId,
		name: &str,
		actor: &UserId,
	) -> Result<Organization, DbError> {
		self.update_organization(org_id, name, actor).await
	}

	async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError> {
		self.get_membership(org_id, user_id).await
	}

	async fn list_user_organizations(
		&self,
		user_id: &UserId,
	) -> Result<Vec<UserOrganization>, DbError> {
		self.list_user_organizations(user_id).await
	}

	async fn list_members(&self, org_id: &OrgId) -> Result<Vec<TeamMember>, DbError> {
		self.list_members(org_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_migrated_test_pool;

	async fn make_repo() -> OrgRepository {
		OrgRepository::new(create_migrated_test_pool().await)
	}

	async fn add_member(repo: &OrgRepository, org_id: &OrgId, user_id: &UserId, role: OrgRole) {
		sqlx::query(
			"INSERT INTO organization_members (organization_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.bind(role.as_str())
		.bind(ts(Utc::now()))
		.execute(&repo.pool)
		.await
		.unwrap();
	}

	#[tokio::test]
	async fn create_organization_makes_creator_owner() {
		let repo = make_repo().await;
		let owner = UserId::generate();

		let org = repo.create_organization("Acme", &owner).await.unwrap();

		let membership = repo.get_membership(&org.id, &owner).await.unwrap().unwrap();
		assert_eq!(membership.role, OrgRole::Owner);
		let fetched = repo.get_org_by_id(&org.id).await.unwrap().unwrap();
		assert_eq!(fetched.name, "Acme");
		assert_eq!(fetched.created_by, owner);
	}

	#[tokio::test]
	async fn get_missing_org_is_none() {
		let repo = make_repo().await;
		assert!(repo.get_org_by_id(&OrgId::generate()).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn admins_can_rename_but_members_cannot() {
		let repo = make_repo().await;
		let owner = UserId::generate();
		let admin = UserId::generate();
		let member = UserId::generate();
		let org = repo.create_organization("Acme", &owner).await.unwrap();
		add_member(&repo, &org.id, &admin, OrgRole::Admin).await;
		add_member(&repo, &org.id, &member, OrgRole::Member).await;

		let renamed = repo
			.update_organization(&org.id, "Acme Corp", &admin)
			.await
			.unwrap();
		assert_eq!(renamed.name, "Acme Corp");

		let err = repo
			.update_organization(&org.id, "Hijacked", &member)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Forbidden(_)));

		let outsider = repo
			.update_organization(&org.id, "Hijacked", &UserId::generate())
			.await
			.unwrap_err();
		assert!(matches!(outsider, DbError::Forbidden(_)));
		assert_eq!(
			repo.get_org_by_id(&org.id).await.unwrap().unwrap().name,
			"Acme Corp"
		);
	}

	#[tokio::test]
	async fn user_organizations_are_normalized_and_ordered() {
		let repo = make_repo().await;
		let user = UserId::generate();
		let first = repo.create_organization("Zeta", &user).await.unwrap();
		let other_owner = UserId::generate();
		let second = repo.create_organization("Alpha", &other_owner).await.unwrap();
		add_member(&repo, &second.id, &user, OrgRole::Member).await;

		let orgs = repo.list_user_organizations(&user).await.unwrap();
		assert_eq!(orgs.len(), 2);
		assert_eq!(orgs[0].organization.id, first.id);
		assert_eq!(orgs[0].role, OrgRole::Owner);
		assert_eq!(orgs[1].organization.id, second.id);
		assert_eq!(orgs[1].role, OrgRole::Member);
	}

	#[tokio::test]
	async fn members_carry_profiles_when_present() {
		let repo = make_repo().await;
		let owner = UserId::generate();
		let org = repo.create_organization("Acme", &owner).await.unwrap();
		let without_profile = UserId::generate();
		add_member(&repo, &org.id, &without_profile, OrgRole::Member).await;

		sqlx::query("INSERT INTO user_profiles (id, email, full_name, created_at) VALUES (?, ?, ?, ?)")
			.bind(owner.to_string())
			.bind("owner@x.com")
			.bind("Olive Owner")
			.bind(ts(Utc::now()))
			.execute(&repo.pool)
			.await
			.unwrap();

		let members = repo.list_members(&org.id).await.unwrap();
		assert_eq!(members.len(), 2);
		assert_eq!(members[0].user_id, owner);
		let profile = members[0].profile.as_ref().unwrap();
		assert_eq!(profile.email, "owner@x.com");
		assert_eq!(profile.full_name.as_deref(), Some("Olive Owner"));
		assert_eq!(members[1].user_id, without_profile);
		assert!(members[1].profile.is_none());
	}
}
