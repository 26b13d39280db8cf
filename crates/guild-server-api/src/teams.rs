// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use guild_server_auth::{Organization, TeamMember, UserOrganization, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::invites::PendingInviteResponse;

/// Create and rename forms.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrgNameForm {
	#[serde(default)]
	pub name: String,
}

/// Context of the create-organization page. It carries nothing; loading it
/// only confirms the session.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CreateTeamPageContext {}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeamQuery {
	#[serde(default)]
	pub created: Option<String>,
	pub success: Option<String>,
	pub error: Option<String>,
}

impl TeamQuery {
	pub fn just_created(&self) -> bool {
		self.created.as_deref() == Some("true")
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
	pub id: String,
	pub name: String,
	pub created_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<&Organization> for OrganizationResponse {
	fn from(org: &Organization) -> Self {
		Self {
			id: org.id.to_string(),
			name: org.name.clone(),
			created_by: org.created_by.to_string(),
			created_at: org.created_at,
			updated_at: org.updated_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserOrganizationResponse {
	pub role: String,
	pub joined_at: DateTime<Utc>,
	pub organization: OrganizationResponse,
}

impl From<&UserOrganization> for UserOrganizationResponse {
	fn from(uo: &UserOrganization) -> Self {
		Self {
			role: uo.role.to_string(),
			joined_at: uo.joined_at,
			organization: OrganizationResponse::from(&uo.organization),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
	pub id: String,
	pub email: String,
	pub full_name: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl From<&UserProfile> for ProfileResponse {
	fn from(p: &UserProfile) -> Self {
		Self {
			id: p.id.to_string(),
			email: p.email.clone(),
			full_name: p.full_name.clone(),
			created_at: p.created_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberResponse {
	pub user_id: String,
	pub role: String,
	pub created_at: DateTime<Utc>,
	pub profile: Option<ProfileResponse>,
}

impl From<&TeamMember> for TeamMemberResponse {
	fn from(m: &TeamMember) -> Self {
		Self {
			user_id: m.user_id.to_string(),
			role: m.role.to_string(),
			created_at: m.created_at,
			profile: m.profile.as_ref().map(ProfileResponse::from),
		}
	}
}

/// Context for rendering `/team/{org_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamPageContext {
	pub current_organization: OrganizationResponse,
	pub user_role: String,
	pub team_members: Vec<TeamMemberResponse>,
	pub pending_invites: Vec<PendingInviteResponse>,
	pub organizations: Vec<UserOrganizationResponse>,
	pub just_created: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub success: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationResponse {
	pub update_success: bool,
	pub message: String,
}
