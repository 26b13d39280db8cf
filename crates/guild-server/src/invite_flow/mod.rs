// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invite reconciliation: the path from an invite link to a membership.
//!
//! The flow is split into four components wired together by [`InviteFlow`]:
//!
//! - [`TokenValidator`]: token to pending, unexpired invite
//! - [`IdentityResolver`]: request credentials to a provider-verified identity
//! - [`ProfileBootstrapper`]: ensures a profile row, non-fatally
//! - [`MembershipReconciler`]: the transactional accept
//!
//! Every collaborator arrives as an explicit `Arc<dyn ...>`, so the flow runs
//! against in-memory fakes in tests.

pub mod identity;
pub mod membership;
pub mod orchestrator;
pub mod profile;
pub mod token;

#[cfg(test)]
pub(crate) mod fakes;

pub use identity::{AuthenticatedIdentity, IdentityResolver, RequestCredentials, ResolvedIdentity};
pub use membership::{MembershipReconciler, ReconcileError, Reconciled};
pub use orchestrator::{
	invite_location, team_location, FlowOutcome, InviteFlow, Redirect, ALREADY_MEMBER_MESSAGE,
	INVALID_MAGIC_LINK_MESSAGE, JOINED_MESSAGE,
};
pub use profile::{ProfileBootstrap, ProfileBootstrapper};
pub use token::{InviteValidationError, TokenValidator, ValidatedInvite};
