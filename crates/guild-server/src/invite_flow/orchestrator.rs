// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The invite flow state machine.
//!
//! Every run ends in exactly one [`FlowOutcome`]: a rendered page, a rendered
//! error, or a redirect. Redirects are ordinary results here, never errors, so
//! nothing downstream can mistake a successful hand-off for a failure.

use std::sync::Arc;

use axum::http::StatusCode;
use guild_server_api::{InvitePageContext, InviteSummary};
use guild_server_auth::{emails_match, AuthProvider, Identity, OrgId, ProviderSession};
use guild_server_db::{InviteStore, ProfileStore};

use super::identity::{IdentityResolver, RequestCredentials, ResolvedIdentity};
use super::membership::MembershipReconciler;
use super::profile::ProfileBootstrapper;
use super::token::{TokenValidator, ValidatedInvite};

pub const JOINED_MESSAGE: &str = "Successfully joined the organization!";
pub const ALREADY_MEMBER_MESSAGE: &str = "You were already a member of this organization";
pub const INVALID_MAGIC_LINK_MESSAGE: &str = "Invalid or expired magic link";

/// A hand-off to another page.
#[derive(Debug, Clone)]
pub struct Redirect {
	pub location: String,
	/// A session opened during this run, to be set as the session cookie.
	pub issued_session: Option<ProviderSession>,
}

#[derive(Debug, Clone)]
pub enum FlowOutcome {
	Render(InvitePageContext),
	RenderError { status: StatusCode, message: String },
	ControlTransfer(Redirect),
}

impl FlowOutcome {
	fn redirect(location: String, issued_session: Option<ProviderSession>) -> Self {
		FlowOutcome::ControlTransfer(Redirect {
			location,
			issued_session,
		})
	}
}

/// `/invite/{token}`, optionally carrying an error message.
pub fn invite_location(token: &str, error: Option<&str>) -> String {
	let base = format!("/invite/{}", urlencoding::encode(token));
	match error {
		Some(msg) => format!("{base}?error={}", urlencoding::encode(msg)),
		None => base,
	}
}

/// `/team/{org_id}?success=<message>`.
pub fn team_location(org_id: &OrgId, success: &str) -> String {
	format!("/team/{org_id}?success={}", urlencoding::encode(success))
}

#[derive(Clone)]
pub struct InviteFlow {
	validator: TokenValidator,
	resolver: IdentityResolver,
	profiles: ProfileBootstrapper,
	reconciler: MembershipReconciler,
}

impl InviteFlow {
	pub fn new(
		invites: Arc<dyn InviteStore>,
		profiles: Arc<dyn ProfileStore>,
		provider: Arc<dyn AuthProvider>,
	) -> Self {
		Self {
			validator: TokenValidator::new(invites.clone()),
			resolver: IdentityResolver::new(provider),
			profiles: ProfileBootstrapper::new(profiles),
			reconciler: MembershipReconciler::new(invites),
		}
	}

	pub fn validator(&self) -> &TokenValidator {
		&self.validator
	}

	/// Render the invite page for an optional signed-in identity.
	#[tracing::instrument(skip_all, fields(signed_in = current.is_some()))]
	pub async fn view(
		&self,
		token: &str,
		current: Option<&Identity>,
		error: Option<String>,
	) -> FlowOutcome {
		let valid = match self.validator.validate(token).await {
			Ok(valid) => valid,
			Err(e) => return render_validation_error(e),
		};

		let matches =
			current.is_some_and(|identity| emails_match(&identity.email, &valid.invite.email));
		FlowOutcome::Render(InvitePageContext {
			invite: InviteSummary::new(&valid.invite, &valid.organization_name),
			can_accept_directly: matches,
			wrong_user: current.is_some() && !matches,
			current_user_email: current.map(|identity| identity.email.clone()),
			error,
		})
	}

	/// Full acceptance run: validate, resolve identity from the request's
	/// credentials, bootstrap the profile, reconcile.
	#[tracing::instrument(skip_all)]
	pub async fn accept(&self, token: &str, credentials: &RequestCredentials) -> FlowOutcome {
		let valid = match self.validator.validate(token).await {
			Ok(valid) => valid,
			Err(e) => return render_validation_error(e),
		};

		match self.resolver.resolve(credentials).await {
			ResolvedIdentity::Authenticated(auth) => {
				self
					.reconcile(token, &valid, &auth.identity, auth.issued_session)
					.await
			}
			ResolvedIdentity::VerificationFailed(_) => FlowOutcome::redirect(
				invite_location(token, Some(INVALID_MAGIC_LINK_MESSAGE)),
				None,
			),
			ResolvedIdentity::Unauthenticated => {
				tracing::debug!("no identity, returning to invite page");
				FlowOutcome::redirect(invite_location(token, None), None)
			}
		}
	}

	/// Acceptance for an identity the caller already resolved.
	#[tracing::instrument(skip_all, fields(user_id = %identity.id))]
	pub async fn accept_as(&self, token: &str, identity: &Identity) -> FlowOutcome {
		match self.validator.validate(token).await {
			Ok(valid) => self.reconcile(token, &valid, identity, None).await,
			Err(e) => render_validation_error(e),
		}
	}

	async fn reconcile(
		&self,
		token: &str,
		valid: &ValidatedInvite,
		identity: &Identity,
		issued_session: Option<ProviderSession>,
	) -> FlowOutcome {
		self.profiles.ensure(identity).await;

		match self.reconciler.reconcile(token, valid, identity).await {
			Ok(done) => {
				let message = if done.already_member {
					ALREADY_MEMBER_MESSAGE
				} else {
					JOINED_MESSAGE
				};
				FlowOutcome::redirect(team_location(&done.organization_id, message), issued_session)
			}
			Err(e) => {
				FlowOutcome::redirect(invite_location(token, Some(&e.to_string())), issued_session)
			}
		}
	}
}

fn render_validation_error(e: super::token::InviteValidationError) -> FlowOutcome {
	FlowOutcome::RenderError {
		status: e.status_code(),
		message: e.user_message(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::invite_flow::fakes::{FakeInvites, FakeProfiles, FakeProvider};
	use chrono::Duration;
	use guild_server_auth::{InviteStatus, OrgRole, UserId};

	struct Harness {
		invites: Arc<FakeInvites>,
		profiles: Arc<FakeProfiles>,
		provider: Arc<FakeProvider>,
		flow: InviteFlow,
	}

	fn harness_with(profiles: FakeProfiles) -> Harness {
		let invites = Arc::new(FakeInvites::default());
		let profiles = Arc::new(profiles);
		let provider = Arc::new(FakeProvider::default());
		let flow = InviteFlow::new(invites.clone(), profiles.clone(), provider.clone());
		Harness {
			invites,
			profiles,
			provider,
			flow,
		}
	}

	fn harness() -> Harness {
		harness_with(FakeProfiles::default())
	}

	fn location(outcome: &FlowOutcome) -> &str {
		match outcome {
			FlowOutcome::ControlTransfer(redirect) => &redirect.location,
			other => panic!("expected redirect, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn session_holder_joins_and_lands_on_team_page() {
		let h = harness();
		let (invite, org_id) = h
			.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");
		let session = h.provider.add_session("a@x.com");

		let outcome = h
			.flow
			.accept("abc123", &RequestCredentials::with_session(Some(session)))
			.await;

		assert_eq!(
			location(&outcome),
			format!("/team/{org_id}?success=Successfully%20joined%20the%20organization%21")
		);
		assert_eq!(h.invites.status_of("abc123"), Some(InviteStatus::Accepted));
		assert_eq!(h.profiles.len(), 1);
		assert_eq!(invite.org_id, org_id);
	}

	#[tokio::test]
	async fn unauthenticated_request_returns_to_invite_without_mutation() {
		let h = harness();
		h.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");

		let outcome = h
			.flow
			.accept("abc123", &RequestCredentials::default())
			.await;

		assert_eq!(location(&outcome), "/invite/abc123");
		assert_eq!(h.invites.status_of("abc123"), Some(InviteStatus::Pending));
		assert_eq!(h.profiles.len(), 0);
	}

	#[tokio::test]
	async fn expired_invite_renders_error_page() {
		let h = harness();
		h.invites
			.insert("expired1", "a@x.com", OrgRole::Member, Duration::days(-1), "Acme");

		let outcome = h.flow.accept("expired1", &RequestCredentials::default()).await;
		match outcome {
			FlowOutcome::RenderError { status, message } => {
				assert_eq!(status, StatusCode::BAD_REQUEST);
				assert_eq!(message, "This invite has expired");
			}
			other => panic!("expected error page, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn failed_magic_link_redirects_with_error() {
		let h = harness();
		h.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");
		let creds = RequestCredentials {
			one_time_token: Some("bogus".into()),
			token_type: Some("magiclink".into()),
			..Default::default()
		};

		let outcome = h.flow.accept("abc123", &creds).await;
		assert_eq!(
			location(&outcome),
			"/invite/abc123?error=Invalid%20or%20expired%20magic%20link"
		);
	}

	#[tokio::test]
	async fn magic_link_run_carries_the_new_session() {
		let h = harness();
		h.invites
			.insert("abc123", "a@x.com", OrgRole::Admin, Duration::days(7), "Acme");
		h.provider.add_one_time("ott", "a@x.com");
		let creds = RequestCredentials {
			one_time_token: Some("ott".into()),
			token_type: Some("magiclink".into()),
			..Default::default()
		};

		let FlowOutcome::ControlTransfer(redirect) = h.flow.accept("abc123", &creds).await else {
			panic!("expected redirect");
		};
		assert!(redirect.location.starts_with("/team/"));
		assert!(redirect.issued_session.is_some());
	}

	#[tokio::test]
	async fn wrong_account_is_sent_back_with_error() {
		let h = harness();
		h.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");
		let identity = Identity::new(UserId::generate(), "b@x.com");

		let outcome = h.flow.accept_as("abc123", &identity).await;
		assert_eq!(
			location(&outcome),
			"/invite/abc123?error=This%20invite%20was%20sent%20to%20a%20different%20email%20address"
		);
		assert_eq!(h.invites.status_of("abc123"), Some(InviteStatus::Pending));
	}

	#[tokio::test]
	async fn repeat_acceptance_reports_existing_membership() {
		let h = harness();
		let (_, org_id) = h
			.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");
		h.invites
			.insert("again", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");
		h.invites.share_org("again", "abc123");
		let identity = Identity::new(UserId::generate(), "a@x.com");

		h.flow.accept_as("abc123", &identity).await;
		let outcome = h.flow.accept_as("again", &identity).await;
		assert_eq!(
			location(&outcome),
			format!(
				"/team/{org_id}?success=You%20were%20already%20a%20member%20of%20this%20organization"
			)
		);
	}

	#[tokio::test]
	async fn profile_failure_does_not_block_joining() {
		let h = harness_with(FakeProfiles::failing());
		h.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");
		let identity = Identity::new(UserId::generate(), "a@x.com");

		let outcome = h.flow.accept_as("abc123", &identity).await;
		assert!(location(&outcome).starts_with("/team/"));
	}

	#[tokio::test]
	async fn view_flags_matching_and_wrong_users() {
		let h = harness();
		h.invites
			.insert("abc123", "a@x.com", OrgRole::Member, Duration::days(7), "Acme");

		let me = Identity::new(UserId::generate(), "A@X.com");
		let FlowOutcome::Render(ctx) = h.flow.view("abc123", Some(&me), None).await else {
			panic!("expected page");
		};
		assert!(ctx.can_accept_directly);
		assert!(!ctx.wrong_user);
		assert_eq!(ctx.invite.organization_name, "Acme");

		let other = Identity::new(UserId::generate(), "b@x.com");
		let FlowOutcome::Render(ctx) = h
			.flow
			.view("abc123", Some(&other), Some("boom".into()))
			.await
		else {
			panic!("expected page");
		};
		assert!(!ctx.can_accept_directly);
		assert!(ctx.wrong_user);
		assert_eq!(ctx.current_user_email.as_deref(), Some("b@x.com"));
		assert_eq!(ctx.error.as_deref(), Some("boom"));

		let FlowOutcome::Render(ctx) = h.flow.view("abc123", None, None).await else {
			panic!("expected page");
		};
		assert!(!ctx.can_accept_directly && !ctx.wrong_user);
		assert!(ctx.current_user_email.is_none());
	}

	#[tokio::test]
	async fn unknown_token_view_is_404() {
		let h = harness();
		match h.flow.view("missing", None, None).await {
			FlowOutcome::RenderError { status, message } => {
				assert_eq!(status, StatusCode::NOT_FOUND);
				assert_eq!(message, "Invite not found");
			}
			other => panic!("expected 404, got {other:?}"),
		}
	}

	#[test]
	fn locations_are_percent_encoded() {
		assert_eq!(invite_location("t", Some("a b&c")), "/invite/t?error=a%20b%26c");
		assert_eq!(invite_location("t", None), "/invite/t");
	}
}
