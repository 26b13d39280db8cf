// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

pub const DEFAULT_INVITE_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct InvitesConfig {
	/// Lifetime of a newly created invite.
	pub expiry_days: i64,
}

impl Default for InvitesConfig {
	fn default() -> Self {
		Self {
			expiry_days: DEFAULT_INVITE_EXPIRY_DAYS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvitesConfigLayer {
	#[serde(default)]
	pub expiry_days: Option<i64>,
}

impl InvitesConfigLayer {
	pub fn merge(&mut self, other: InvitesConfigLayer) {
		if other.expiry_days.is_some() {
			self.expiry_days = other.expiry_days;
		}
	}

	pub fn finalize(self) -> InvitesConfig {
		InvitesConfig {
			expiry_days: self.expiry_days.unwrap_or(DEFAULT_INVITE_EXPIRY_DAYS),
		}
	}
}
