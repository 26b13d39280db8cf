// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organizations, memberships and invites.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{InviteId, InviteStatus, OrgId, OrgRole, UserId};
use crate::user::UserProfile;

/// Random bytes in a plaintext invite token.
pub const INVITE_TOKEN_BYTES: usize = 32;

/// Maximum organization name length, counted in characters after trimming.
pub const ORG_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
	pub id: OrgId,
	pub name: String,
	pub created_by: UserId,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Organization {
	pub fn new(name: impl Into<String>, created_by: UserId) -> Self {
		let now = Utc::now();
		Self {
			id: OrgId::generate(),
			name: name.into(),
			created_by,
			created_at: now,
			updated_at: now,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembership {
	pub org_id: OrgId,
	pub user_id: UserId,
	pub role: OrgRole,
	pub created_at: DateTime<Utc>,
}

impl OrgMembership {
	pub fn new(org_id: OrgId, user_id: UserId, role: OrgRole) -> Self {
		Self {
			org_id,
			user_id,
			role,
			created_at: Utc::now(),
		}
	}
}

/// A user's membership joined with its organization. Membership listings always
/// have this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrganization {
	pub role: OrgRole,
	pub joined_at: DateTime<Utc>,
	pub organization: Organization,
}

/// A membership joined with the member's profile, if one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
	pub user_id: UserId,
	pub role: OrgRole,
	pub created_at: DateTime<Utc>,
	pub profile: Option<UserProfile>,
}

/// An invite as stored. The plaintext token is never kept; see
/// [`crate::hash_token`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgInvite {
	pub id: InviteId,
	pub org_id: OrgId,
	pub email: String,
	pub role: OrgRole,
	pub token_hash: String,
	pub status: InviteStatus,
	pub invited_by: UserId,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub accepted_at: Option<DateTime<Utc>>,
	pub accepted_by: Option<UserId>,
}

impl OrgInvite {
	/// Create a pending invite and return it with its plaintext token.
	pub fn new(
		org_id: OrgId,
		email: &str,
		role: OrgRole,
		invited_by: UserId,
		expiry: Duration,
	) -> (Self, String) {
		let token = generate_invite_token();
		let now = Utc::now();
		let invite = Self {
			id: InviteId::generate(),
			org_id,
			email: crate::user::normalize_email(email),
			role,
			token_hash: crate::hash_token(&token),
			status: InviteStatus::Pending,
			invited_by,
			expires_at: now + expiry,
			created_at: now,
			accepted_at: None,
			accepted_by: None,
		};
		(invite, token)
	}

	/// Expiry is computed from `expires_at`, independent of the stored status.
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}

	pub fn is_addressed_to(&self, email: &str) -> bool {
		crate::user::emails_match(&self.email, email)
	}
}

pub fn generate_invite_token() -> String {
	use rand::Rng;

	let bytes: [u8; INVITE_TOKEN_BYTES] = rand::thread_rng().gen();
	hex::encode(bytes)
}

/// Trim and check an organization name.
pub fn validate_org_name(name: &str) -> Result<String, &'static str> {
	let trimmed = name.trim();
	if trimmed.is_empty() {
		return Err("Organization name is required");
	}
	if trimmed.chars().count() > ORG_NAME_MAX_CHARS {
		return Err("Organization name is too long");
	}
	Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn new_invite_is_pending_with_hashed_token() {
		let (invite, token) = OrgInvite::new(
			OrgId::generate(),
			" New.Member@Example.com",
			OrgRole::Member,
			UserId::generate(),
			Duration::days(7),
		);
		assert_eq!(invite.status, InviteStatus::Pending);
		assert_eq!(invite.email, "new.member@example.com");
		assert_eq!(invite.token_hash, crate::hash_token(&token));
		assert_ne!(invite.token_hash, token);
		assert_eq!(invite.expires_at - invite.created_at, Duration::days(7));
	}

	#[test]
	fn expiry_is_computed_not_stored() {
		let (invite, _) = OrgInvite::new(
			OrgId::generate(),
			"a@x.com",
			OrgRole::Member,
			UserId::generate(),
			Duration::days(1),
		);
		assert!(!invite.is_expired_at(invite.created_at));
		assert!(invite.is_expired_at(invite.expires_at));
		assert_eq!(invite.status, InviteStatus::Pending);
	}

	#[test]
	fn addressed_to_ignores_case() {
		let (invite, _) = OrgInvite::new(
			OrgId::generate(),
			"a@x.com",
			OrgRole::Admin,
			UserId::generate(),
			Duration::days(1),
		);
		assert!(invite.is_addressed_to("A@X.com"));
		assert!(!invite.is_addressed_to("b@x.com"));
	}

	#[test]
	fn org_name_validation_messages() {
		assert_eq!(validate_org_name("   "), Err("Organization name is required"));
		assert_eq!(
			validate_org_name(&"x".repeat(101)),
			Err("Organization name is too long")
		);
		assert_eq!(validate_org_name("  Acme  "), Ok("Acme".to_string()));
		assert!(validate_org_name(&"é".repeat(100)).is_ok());
	}

	proptest! {
		#[test]
		fn invite_tokens_are_hex(_ in 0..20u32) {
			let token = generate_invite_token();
			prop_assert_eq!(token.len(), INVITE_TOKEN_BYTES * 2);
			prop_assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
		}
	}
}
