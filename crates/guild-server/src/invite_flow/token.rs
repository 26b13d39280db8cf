// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token validation: resolve an invite token to a live, pending invite.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use guild_server_auth::{InviteStatus, OrgInvite};
use guild_server_db::{DbError, InviteStore};

#[derive(Debug, thiserror::Error)]
pub enum InviteValidationError {
	#[error("Invite not found")]
	NotFound,

	#[error("This invite has already been {status}")]
	AlreadyProcessed { status: InviteStatus },

	#[error("This invite has expired")]
	Expired,

	#[error("Failed to load invite: {0}")]
	Store(#[from] DbError),
}

impl InviteValidationError {
	/// Status of the page rendered for this failure.
	pub fn status_code(&self) -> StatusCode {
		match self {
			InviteValidationError::NotFound => StatusCode::NOT_FOUND,
			InviteValidationError::AlreadyProcessed { .. } | InviteValidationError::Expired => {
				StatusCode::BAD_REQUEST
			}
			InviteValidationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Text shown on the error page.
	pub fn user_message(&self) -> String {
		match self {
			InviteValidationError::Store(_) => "Failed to load invite".to_string(),
			other => other.to_string(),
		}
	}
}

/// A pending invite that has not expired.
#[derive(Debug, Clone)]
pub struct ValidatedInvite {
	pub invite: OrgInvite,
	pub organization_name: String,
}

#[derive(Clone)]
pub struct TokenValidator {
	invites: Arc<dyn InviteStore>,
}

impl TokenValidator {
	pub fn new(invites: Arc<dyn InviteStore>) -> Self {
		Self { invites }
	}

	pub async fn validate(&self, token: &str) -> Result<ValidatedInvite, InviteValidationError> {
		self.validate_at(token, Utc::now()).await
	}

	/// Status is checked before expiry, so an accepted invite past its expiry
	/// still reports that it was accepted. Expiry never rewrites the stored
	/// status.
	#[tracing::instrument(skip(self, token))]
	pub async fn validate_at(
		&self,
		token: &str,
		now: DateTime<Utc>,
	) -> Result<ValidatedInvite, InviteValidationError> {
		let lookup = self.invites.get_invite_by_token(token).await;
		let details = lookup.map_err(|e| {
			tracing::error!(
				error = %e,
				token_prefix = token.get(..8).unwrap_or(token),
				"Failed to load invite"
			);
			InviteValidationError::Store(e)
		})?;
		let Some(details) = details else {
			tracing::debug!("invite token not found");
			return Err(InviteValidationError::NotFound);
		};

		let invite = details.invite;
		if !invite.status.is_pending() {
			tracing::debug!(invite_id = %invite.id, status = %invite.status, "invite already processed");
			return Err(InviteValidationError::AlreadyProcessed {
				status: invite.status,
			});
		}

		if invite.is_expired_at(now) {
			tracing::debug!(invite_id = %invite.id, expires_at = %invite.expires_at, "invite expired");
			return Err(InviteValidationError::Expired);
		}

		Ok(ValidatedInvite {
			invite,
			organization_name: details.organization_name,
		})
	}
}
