// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire types for the Guild server.
//!
//! Page contexts and JSON responses use camelCase keys. Form bodies keep the
//! field names of the HTML forms that post them.

pub mod auth;
pub mod common;
pub mod invites;
pub mod logs;
pub mod teams;

pub use auth::{CallbackQuery, ConfirmQuery, EmailForm};
pub use common::{ActionResponse, ErrorResponse, HealthResponse, MessageQuery};
pub use invites::{
	AcceptQuery, CheckInvitesResponse, CreateInviteForm, CreateInviteResponse,
	InvitePageContext, InviteSummary, JoinedOrganizationResponse, PendingInviteResponse,
};
pub use logs::{ClientLogEntry, ClientLogLevel};
pub use teams::{
	CreateTeamPageContext, OrgNameForm, OrganizationResponse, ProfileResponse, TeamMemberResponse,
	TeamPageContext, TeamQuery, UpdateOrganizationResponse, UserOrganizationResponse,
};
