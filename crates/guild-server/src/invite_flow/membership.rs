// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Membership reconciliation: turn a pending invite plus a verified identity
//! into a membership.
//!
//! All checks and writes happen inside the store's acceptance transaction. The
//! reconciler re-validates nothing itself and never issues a separate read
//! before the write.

use std::sync::Arc;

use guild_server_auth::{Identity, OrgId};
use guild_server_db::{AcceptedInvite, DbError, InviteStore};

use super::token::ValidatedInvite;

const ACCEPT_FAILED: &str = "Failed to accept invite";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
	/// The identity's email does not match the invite.
	#[error("{0}")]
	Forbidden(String),

	/// The token was unknown or expired at transaction time.
	#[error("{0}")]
	NotFound(String),

	/// Any other refusal, including storage failures.
	#[error("{0}")]
	Conflict(String),
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
	pub organization_id: OrgId,
	pub already_member: bool,
}

impl From<AcceptedInvite> for Reconciled {
	fn from(accepted: AcceptedInvite) -> Self {
		Self {
			organization_id: accepted.organization_id,
			already_member: accepted.already_member,
		}
	}
}

#[derive(Clone)]
pub struct MembershipReconciler {
	invites: Arc<dyn InviteStore>,
}

impl MembershipReconciler {
	pub fn new(invites: Arc<dyn InviteStore>) -> Self {
		Self { invites }
	}

	#[tracing::instrument(
		skip_all,
		fields(invite_id = %invite.invite.id, org_id = %invite.invite.org_id, user_id = %identity.id)
	)]
	pub async fn reconcile(
		&self,
		token: &str,
		invite: &ValidatedInvite,
		identity: &Identity,
	) -> Result<Reconciled, ReconcileError> {
		match self
			.invites
			.accept_invite(token, &identity.id, &identity.email)
			.await
		{
			Ok(accepted) => {
				tracing::info!(
					already_member = accepted.already_member,
					"invite reconciled"
				);
				Ok(accepted.into())
			}
			Err(DbError::Forbidden(msg)) => {
				tracing::info!(reason = %msg, "invite refused for identity");
				Err(ReconcileError::Forbidden(msg))
			}
			Err(DbError::NotFound(msg)) => {
				tracing::info!(reason = %msg, "invite vanished before acceptance");
				Err(ReconcileError::NotFound(msg))
			}
			Err(DbError::Conflict(msg)) => {
				tracing::info!(reason = %msg, "invite acceptance conflict");
				Err(ReconcileError::Conflict(msg))
			}
			Err(e) => {
				tracing::error!(
					error = %e,
					organization = %invite.organization_name,
					"Failed to accept invite"
				);
				Err(ReconcileError::Conflict(ACCEPT_FAILED.to_string()))
			}
		}
	}
}
