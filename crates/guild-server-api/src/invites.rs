// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use guild_server_auth::OrgInvite;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The invite as shown on the invite page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteSummary {
	pub id: String,
	pub email: String,
	pub role: String,
	pub expires_at: DateTime<Utc>,
	pub status: String,
	pub organization_name: String,
}

impl InviteSummary {
	pub fn new(invite: &OrgInvite, organization_name: &str) -> Self {
		Self {
			id: invite.id.to_string(),
			email: invite.email.clone(),
			role: invite.role.to_string(),
			expires_at: invite.expires_at,
			status: invite.status.to_string(),
			organization_name: organization_name.to_string(),
		}
	}
}

/// Context for rendering `/invite/{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitePageContext {
	pub invite: InviteSummary,
	pub can_accept_directly: bool,
	pub wrong_user: bool,
	pub current_user_email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// One-time credential appended to the magic link that lands on
/// `/invite/{token}/accept`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AcceptQuery {
	pub token: Option<String>,
	#[serde(rename = "type")]
	pub token_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateInviteForm {
	#[serde(default)]
	pub email: String,
	#[serde(default = "default_invite_role")]
	pub role: String,
}

fn default_invite_role() -> String {
	"member".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteResponse {
	pub success: bool,
	pub invite_url: String,
	pub development_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingInviteResponse {
	pub id: String,
	pub email: String,
	pub role: String,
	pub status: String,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl From<&OrgInvite> for PendingInviteResponse {
	fn from(invite: &OrgInvite) -> Self {
		Self {
			id: invite.id.to_string(),
			email: invite.email.clone(),
			role: invite.role.to_string(),
			status: invite.status.to_string(),
			created_at: invite.created_at,
			expires_at: invite.expires_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinedOrganizationResponse {
	pub organization_id: String,
	pub organization_name: String,
	pub role: String,
}

/// Response of `POST /api/check-invites`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInvitesResponse {
	pub success: bool,
	pub accepted_count: usize,
	pub invites: Vec<JoinedOrganizationResponse>,
}
