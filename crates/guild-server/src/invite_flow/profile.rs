// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use guild_server_auth::{Identity, UserProfile};
use guild_server_db::{DbError, ProfileStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileBootstrap {
	Existing,
	Created,
	/// The profile could not be ensured. Carries the store's message.
	Failed(String),
}

/// Guarantees a [`UserProfile`] row for an authenticated identity.
#[derive(Clone)]
pub struct ProfileBootstrapper {
	profiles: Arc<dyn ProfileStore>,
}

impl ProfileBootstrapper {
	pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
		Self { profiles }
	}

	/// Ensure the profile exists. Failures are logged and reported, never
	/// propagated: a missing profile does not block sign-in.
	#[tracing::instrument(skip_all, fields(user_id = %identity.id))]
	pub async fn ensure(&self, identity: &Identity) -> ProfileBootstrap {
		match self.ensure_strict(identity).await {
			Ok(outcome) => outcome,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to create user profile, continuing");
				ProfileBootstrap::Failed(e.user_message())
			}
		}
	}

	/// Ensure the profile exists, propagating store failures.
	pub async fn ensure_strict(&self, identity: &Identity) -> Result<ProfileBootstrap, DbError> {
		if self.profiles.get_profile(&identity.id).await?.is_some() {
			return Ok(ProfileBootstrap::Existing);
		}

		match self
			.profiles
			.create_profile(&UserProfile::for_identity(identity))
			.await
		{
			Ok(()) => {
				tracing::info!(user_id = %identity.id, "user profile created");
				Ok(ProfileBootstrap::Created)
			}
			// A concurrent request created it between the check and the insert.
			Err(DbError::Conflict(_)) => Ok(ProfileBootstrap::Existing),
			Err(e) => Err(e),
		}
	}
}
