// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier newtypes, organization roles and invite status.
//!
//! Ids serialize transparently as UUID strings. Roles and statuses serialize as
//! the lowercase names stored in the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(
	UserId,
	"Identity id issued by the auth provider. Profiles share this id."
);
define_id_type!(OrgId, "Unique identifier for an organization.");
define_id_type!(InviteId, "Unique identifier for an organization invite.");
define_id_type!(SessionId, "Unique identifier for a locally issued session.");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
	pub kind: &'static str,
	pub value: String,
}

/// Role of a member within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
	Owner,
	Admin,
	Member,
}

impl OrgRole {
	pub fn all() -> &'static [OrgRole] {
		&[OrgRole::Owner, OrgRole::Admin, OrgRole::Member]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			OrgRole::Owner => "owner",
			OrgRole::Admin => "admin",
			OrgRole::Member => "member",
		}
	}

	/// Owners and admins manage invites, settings and membership.
	pub fn can_manage(&self) -> bool {
		matches!(self, OrgRole::Owner | OrgRole::Admin)
	}

	/// Whether a member with this role may invite someone as `target`.
	pub fn can_invite_as(&self, target: OrgRole) -> bool {
		match self {
			OrgRole::Owner => true,
			OrgRole::Admin => target != OrgRole::Owner,
			OrgRole::Member => false,
		}
	}
}

impl fmt::Display for OrgRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrgRole {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"owner" => Ok(OrgRole::Owner),
			"admin" => Ok(OrgRole::Admin),
			"member" => Ok(OrgRole::Member),
			other => Err(ParseEnumError {
				kind: "role",
				value: other.to_string(),
			}),
		}
	}
}

/// Lifecycle of an invite. Only `Pending` moves forward, to any of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
	Pending,
	Accepted,
	Expired,
	Revoked,
}

impl InviteStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			InviteStatus::Pending => "pending",
			InviteStatus::Accepted => "accepted",
			InviteStatus::Expired => "expired",
			InviteStatus::Revoked => "revoked",
		}
	}

	pub fn is_pending(&self) -> bool {
		matches!(self, InviteStatus::Pending)
	}

	pub fn can_transition_to(&self, next: InviteStatus) -> bool {
		matches!(
			(self, next),
			(
				InviteStatus::Pending,
				InviteStatus::Accepted | InviteStatus::Expired | InviteStatus::Revoked
			)
		)
	}
}

impl fmt::Display for InviteStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for InviteStatus {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(InviteStatus::Pending),
			"accepted" => Ok(InviteStatus::Accepted),
			"expired" => Ok(InviteStatus::Expired),
			"revoked" => Ok(InviteStatus::Revoked),
			other => Err(ParseEnumError {
				kind: "invite status",
				value: other.to_string(),
			}),
		}
	}
}
