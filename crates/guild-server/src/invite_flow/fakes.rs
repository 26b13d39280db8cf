// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory stand-ins for the stores and the auth provider.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use guild_server_auth::{
	generate_session_token, AuthProvider, AuthProviderError, Identity, InviteId, InviteStatus,
	OneTimeTokenType, OrgId, OrgInvite, OrgRole, ProviderSession, UserId, UserProfile,
};
use guild_server_db::{
	AcceptedInvite, AutoAcceptedInvite, CreatedInvite, DbError, InviteDetails, InviteStore,
	ProfileStore,
};

#[derive(Default)]
pub struct FakeInvites {
	invites: Mutex<HashMap<String, InviteDetails>>,
	members: Mutex<HashSet<(OrgId, UserId)>>,
	fail_accepts: Mutex<bool>,
	fail_lookups: Mutex<bool>,
}

impl FakeInvites {
	/// Store a pending invite under `token` for a fresh organization.
	pub fn insert(
		&self,
		token: &str,
		email: &str,
		role: OrgRole,
		expiry: Duration,
		organization_name: &str,
	) -> (OrgInvite, OrgId) {
		let org_id = OrgId::generate();
		let (invite, _) = OrgInvite::new(org_id, email, role, UserId::generate(), expiry);
		self.invites.lock().unwrap().insert(
			token.to_string(),
			InviteDetails {
				invite: invite.clone(),
				organization_name: organization_name.to_string(),
			},
		);
		(invite, org_id)
	}

	/// Move the invite under `token` into the organization of `other`.
	pub fn share_org(&self, token: &str, other: &str) {
		let mut invites = self.invites.lock().unwrap();
		let org_id = invites[other].invite.org_id;
		if let Some(details) = invites.get_mut(token) {
			details.invite.org_id = org_id;
		}
	}

	pub fn set_status(&self, token: &str, status: InviteStatus) {
		if let Some(details) = self.invites.lock().unwrap().get_mut(token) {
			details.invite.status = status;
		}
	}

	pub fn status_of(&self, token: &str) -> Option<InviteStatus> {
		self
			.invites
			.lock()
			.unwrap()
			.get(token)
			.map(|d| d.invite.status)
	}

	pub fn remove(&self, token: &str) {
		self.invites.lock().unwrap().remove(token);
	}

	pub fn fail_accepts(&self) {
		*self.fail_accepts.lock().unwrap() = true;
	}

	pub fn fail_lookups(&self) {
		*self.fail_lookups.lock().unwrap() = true;
	}

	pub fn membership_count(&self, org_id: &OrgId, user_id: &UserId) -> usize {
		usize::from(self.members.lock().unwrap().contains(&(*org_id, *user_id)))
	}
}

#[async_trait]
impl InviteStore for FakeInvites {
	async fn create_invite(
		&self,
		org_id: &OrgId,
		email: &str,
		role: OrgRole,
		invited_by: &UserId,
		expiry: Duration,
	) -> Result<CreatedInvite, DbError> {
		let (invite, token) = OrgInvite::new(*org_id, email, role, *invited_by, expiry);
		self.invites.lock().unwrap().insert(
			token.clone(),
			InviteDetails {
				invite: invite.clone(),
				organization_name: String::new(),
			},
		);
		Ok(CreatedInvite { invite, token })
	}

	async fn get_invite_by_token(&self, token: &str) -> Result<Option<InviteDetails>, DbError> {
		if *self.fail_lookups.lock().unwrap() {
			return Err(DbError::Internal("no such table: organization_invites".to_string()));
		}
		Ok(self.invites.lock().unwrap().get(token).cloned())
	}

	async fn accept_invite(
		&self,
		token: &str,
		user_id: &UserId,
		email: &str,
	) -> Result<AcceptedInvite, DbError> {
		if *self.fail_accepts.lock().unwrap() {
			return Err(DbError::Internal("disk I/O error".to_string()));
		}

		let mut invites = self.invites.lock().unwrap();
		let Some(details) = invites.get_mut(token) else {
			return Err(DbError::NotFound("Invite not found".to_string()));
		};
		let invite = &mut details.invite;
		if invite.is_expired_at(Utc::now()) {
			return Err(DbError::NotFound("Invite not found or expired".to_string()));
		}
		if !invite.is_addressed_to(email) {
			return Err(DbError::Forbidden(
				"This invite was sent to a different email address".to_string(),
			));
		}

		let mut members = self.members.lock().unwrap();
		let key = (invite.org_id, *user_id);
		if members.contains(&key) {
			return Ok(AcceptedInvite {
				organization_id: invite.org_id,
				already_member: true,
			});
		}
		if !invite.status.is_pending() {
			return Err(DbError::Conflict(format!(
				"Invite has already been {}",
				invite.status
			)));
		}

		members.insert(key);
		invite.status = InviteStatus::Accepted;
		invite.accepted_by = Some(*user_id);
		invite.accepted_at = Some(Utc::now());
		Ok(AcceptedInvite {
			organization_id: invite.org_id,
			already_member: false,
		})
	}

	async fn list_pending_invites(&self, org_id: &OrgId) -> Result<Vec<OrgInvite>, DbError> {
		Ok(self
			.invites
			.lock()
			.unwrap()
			.values()
			.filter(|d| d.invite.org_id == *org_id && d.invite.status.is_pending())
			.map(|d| d.invite.clone())
			.collect())
	}

	async fn check_pending_invites(
		&self,
		_user_id: &UserId,
		_email: &str,
	) -> Result<Vec<AutoAcceptedInvite>, DbError> {
		Ok(Vec::new())
	}

	async fn revoke_invite(
		&self,
		_org_id: &OrgId,
		invite_id: &InviteId,
		_actor: &UserId,
	) -> Result<(), DbError> {
		let mut invites = self.invites.lock().unwrap();
		let details = invites
			.values_mut()
			.find(|d| d.invite.id == *invite_id)
			.ok_or_else(|| DbError::NotFound("Invite not found".to_string()))?;
		details.invite.status = InviteStatus::Revoked;
		Ok(())
	}
}

#[derive(Default)]
pub struct FakeProfiles {
	profiles: Mutex<HashMap<UserId, UserProfile>>,
	failing: bool,
}

impl FakeProfiles {
	pub fn failing() -> Self {
		Self {
			failing: true,
			..Default::default()
		}
	}

	pub fn len(&self) -> usize {
		self.profiles.lock().unwrap().len()
	}
}

#[async_trait]
impl ProfileStore for FakeProfiles {
	async fn get_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DbError> {
		Ok(self.profiles.lock().unwrap().get(id).cloned())
	}

	async fn create_profile(&self, profile: &UserProfile) -> Result<(), DbError> {
		if self.failing {
			return Err(DbError::Internal("profiles table unavailable".to_string()));
		}
		self
			.profiles
			.lock()
			.unwrap()
			.insert(profile.id, profile.clone());
		Ok(())
	}
}

#[derive(Default)]
pub struct FakeProvider {
	sessions: Mutex<HashMap<String, Identity>>,
	one_time: Mutex<HashMap<String, Identity>>,
	failing_lookups: bool,
}

impl FakeProvider {
	pub fn failing_lookups() -> Self {
		Self {
			failing_lookups: true,
			..Default::default()
		}
	}

	/// Open a session for a new identity with `email`; returns the session token.
	pub fn add_session(&self, email: &str) -> String {
		let token = generate_session_token().expose().clone();
		self
			.sessions
			.lock()
			.unwrap()
			.insert(token.clone(), Identity::new(UserId::generate(), email));
		token
	}

	pub fn add_one_time(&self, token: &str, email: &str) {
		self
			.one_time
			.lock()
			.unwrap()
			.insert(token.to_string(), Identity::new(UserId::generate(), email));
	}
}

#[async_trait]
impl AuthProvider for FakeProvider {
	async fn send_magic_link(
		&self,
		_email: &str,
		_redirect_to: &str,
		_create_user: bool,
	) -> Result<(), AuthProviderError> {
		Ok(())
	}

	async fn verify_one_time_token(
		&self,
		token: &str,
		_token_type: OneTimeTokenType,
	) -> Result<ProviderSession, AuthProviderError> {
		let identity = self
			.one_time
			.lock()
			.unwrap()
			.remove(token)
			.ok_or(AuthProviderError::InvalidCredential)?;
		let session_token = generate_session_token();
		self
			.sessions
			.lock()
			.unwrap()
			.insert(session_token.expose().clone(), identity.clone());
		Ok(ProviderSession {
			identity,
			session_token,
			expires_at: Utc::now() + Duration::days(30),
		})
	}

	async fn exchange_code_for_session(
		&self,
		_code: &str,
	) -> Result<ProviderSession, AuthProviderError> {
		Err(AuthProviderError::Unsupported("OAuth code exchange"))
	}

	async fn get_current_session(
		&self,
		session_token: &str,
	) -> Result<Option<Identity>, AuthProviderError> {
		if self.failing_lookups {
			return Err(AuthProviderError::Http("connection refused".to_string()));
		}
		Ok(self.sessions.lock().unwrap().get(session_token).cloned())
	}

	async fn sign_out(&self, session_token: &str) -> Result<(), AuthProviderError> {
		self.sessions.lock().unwrap().remove(session_token);
		Ok(())
	}
}
