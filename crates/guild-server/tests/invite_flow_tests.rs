// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for the invite flow over HTTP.
//!
//! Tests cover:
//! - Magic-link sign-in and the session cookie
//! - Creating a team and inviting a member
//! - Invite page context for anonymous and signed-in visitors
//! - Signing up through an invite and accepting it
//! - Replayed, unknown and misaddressed invites

use std::sync::Arc;

use axum::{
	body::Body,
	http::{
		header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
		Request, Response, StatusCode,
	},
	Router,
};
use guild_server::{
	create_app_state_with_delivery, create_router, testing::RecordingDelivery, ServerConfig,
};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

struct TestApp {
	app: Router,
	delivery: Arc<RecordingDelivery>,
	_dir: TempDir,
}

impl TestApp {
	async fn new() -> Self {
		let dir = tempdir().unwrap();
		let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("guild.db").display());
		let pool = guild_server_db::create_pool(&db_url).await.unwrap();
		guild_server_db::run_migrations(&pool).await.unwrap();

		let delivery = Arc::new(RecordingDelivery::default());
		let state = create_app_state_with_delivery(pool, &ServerConfig::default(), delivery.clone());
		Self {
			app: create_router(state),
			delivery,
			_dir: dir,
		}
	}

	async fn send(&self, request: Request<Body>) -> Response<Body> {
		self.app.clone().oneshot(request).await.unwrap()
	}

	async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
		let mut builder = Request::builder().uri(uri);
		if let Some(cookie) = cookie {
			builder = builder.header(COOKIE, cookie);
		}
		self.send(builder.body(Body::empty()).unwrap()).await
	}

	async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
		let mut builder = Request::builder()
			.method("POST")
			.uri(uri)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
		if let Some(cookie) = cookie {
			builder = builder.header(COOKIE, cookie);
		}
		self.send(builder.body(Body::from(form.to_string())).unwrap()).await
	}

	/// Request a link at `/auth/login`, follow it, and return the cookie pair.
	async fn sign_in(&self, email: &str) -> String {
		let response = self.post_form("/auth/login", &email_form(email), None).await;
		assert_eq!(response.status(), StatusCode::OK);

		let link = self.delivery.last_for(email).expect("link delivered");
		let response = self.get(&path_of(&link), None).await;
		assert_eq!(response.status(), StatusCode::SEE_OTHER);
		assert_eq!(location(&response), "/team");
		session_cookie(&response).expect("session cookie set")
	}

	/// Create a team as `cookie` and return its id.
	async fn create_team(&self, cookie: &str, name: &str) -> String {
		let form = format!("name={}", urlencoding::encode(name));
		let response = self.post_form("/team/create", &form, Some(cookie)).await;
		assert_eq!(response.status(), StatusCode::SEE_OTHER);
		let location = location(&response);
		let id = location
			.strip_prefix("/team/")
			.and_then(|rest| rest.strip_suffix("?created=true"))
			.expect("redirect to the new team");
		id.to_string()
	}

	/// Invite `email` into `org_id` and return the invite token.
	async fn invite(&self, cookie: &str, org_id: &str, email: &str, role: &str) -> String {
		let form = format!("{}&role={role}", email_form(email));
		let response = self
			.post_form(&format!("/team/{org_id}/invite"), &form, Some(cookie))
			.await;
		assert_eq!(response.status(), StatusCode::OK);
		let body = json(response).await;
		assert_eq!(body["success"], true);
		assert_eq!(body["developmentMode"], true);
		let url = body["inviteUrl"].as_str().unwrap();
		assert!(url.starts_with("http://localhost:8080/invite/"));
		url.rsplit('/').next().unwrap().to_string()
	}
}

fn email_form(email: &str) -> String {
	format!("email={}", urlencoding::encode(email))
}

fn path_of(link: &str) -> String {
	let url = url::Url::parse(link).unwrap();
	match url.query() {
		Some(q) => format!("{}?{q}", url.path()),
		None => url.path().to_string(),
	}
}

fn location(response: &Response<Body>) -> String {
	response.headers()[LOCATION].to_str().unwrap().to_string()
}

fn session_cookie(response: &Response<Body>) -> Option<String> {
	response
		.headers()
		.get_all(SET_COOKIE)
		.iter()
		.filter_map(|v| v.to_str().ok())
		.find(|v| v.starts_with("guild_session=") && !v.contains("Max-Age=0"))
		.and_then(|v| v.split(';').next())
		.map(str::to_string)
}

async fn json(response: Response<Body>) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Full flow
// ============================================================================

#[tokio::test]
async fn invitee_signs_up_through_invite_and_joins() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	let token = t.invite(&alice, &org_id, "bob@example.com", "member").await;

	let response = t.get(&format!("/invite/{token}"), None).await;
	assert_eq!(response.status(), StatusCode::OK);
	let page = json(response).await;
	assert_eq!(page["invite"]["organizationName"], "Acme");
	assert_eq!(page["invite"]["email"], "bob@example.com");
	assert_eq!(page["invite"]["status"], "pending");
	assert_eq!(page["canAcceptDirectly"], false);
	assert_eq!(page["wrongUser"], false);

	let response = t
		.post_form(
			&format!("/invite/{token}/signup"),
			&email_form("Bob@Example.com"),
			None,
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = json(response).await;
	assert_eq!(body["message"], "Check your email for a sign-in link!");

	let link = t.delivery.last_for("bob@example.com").expect("invite link sent");
	assert!(link.contains(&format!("/invite/{token}/accept?token=")));

	let response = t.get(&path_of(&link), None).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(
		location(&response),
		format!("/team/{org_id}?success=Successfully%20joined%20the%20organization%21")
	);
	let bob = session_cookie(&response).expect("session issued on acceptance");

	let response = t.get(&format!("/team/{org_id}"), Some(&bob)).await;
	assert_eq!(response.status(), StatusCode::OK);
	let page = json(response).await;
	assert_eq!(page["userRole"], "member");
	assert_eq!(page["teamMembers"].as_array().unwrap().len(), 2);
	assert!(page["pendingInvites"].as_array().unwrap().is_empty());

	// The token is spent.
	let response = t.get(&format!("/invite/{token}"), None).await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json(response).await["message"], "This invite has already been accepted");
}

#[tokio::test]
async fn signed_in_invitee_accepts_directly() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	let token = t.invite(&alice, &org_id, "carol@example.com", "admin").await;
	let carol = t.sign_in("carol@example.com").await;

	let page = json(t.get(&format!("/invite/{token}"), Some(&carol)).await).await;
	assert_eq!(page["canAcceptDirectly"], true);
	assert_eq!(page["currentUserEmail"], "carol@example.com");

	let response = t
		.post_form(&format!("/invite/{token}/accept"), "", Some(&carol))
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert!(location(&response).starts_with(&format!("/team/{org_id}?success=")));

	let page = json(t.get(&format!("/team/{org_id}"), Some(&carol)).await).await;
	assert_eq!(page["userRole"], "admin");
}

#[tokio::test]
async fn owner_sees_pending_invites_until_revoked() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	t.invite(&alice, &org_id, "dan@example.com", "member").await;

	let page = json(t.get(&format!("/team/{org_id}?created=true"), Some(&alice)).await).await;
	assert_eq!(page["justCreated"], true);
	assert_eq!(page["userRole"], "owner");
	let pending = page["pendingInvites"].as_array().unwrap();
	assert_eq!(pending.len(), 1);
	let invite_id = pending[0]["id"].as_str().unwrap().to_string();

	let revoke = format!("/team/{org_id}/invites/{invite_id}/revoke");
	let response = t.post_form(&revoke, "", Some(&alice)).await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = t.post_form(&revoke, "", Some(&alice)).await;
	assert_eq!(response.status(), StatusCode::CONFLICT);

	let page = json(t.get(&format!("/team/{org_id}"), Some(&alice)).await).await;
	assert!(page["pendingInvites"].as_array().unwrap().is_empty());
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn unknown_invite_is_not_found() {
	let t = TestApp::new().await;
	let response = t.get("/invite/does-not-exist", None).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(json(response).await["message"], "Invite not found");
}

#[tokio::test]
async fn accepting_without_a_session_is_unauthorized() {
	let t = TestApp::new().await;
	let response = t.post_form("/invite/anything/accept", "", None).await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(
		json(response).await["message"],
		"Must be logged in to accept invite"
	);
}

#[tokio::test]
async fn wrong_user_is_sent_back_to_the_invite() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	let token = t.invite(&alice, &org_id, "erin@example.com", "member").await;
	let mallory = t.sign_in("mallory@example.com").await;

	let page = json(t.get(&format!("/invite/{token}"), Some(&mallory)).await).await;
	assert_eq!(page["wrongUser"], true);
	assert_eq!(page["canAcceptDirectly"], false);

	let response = t
		.post_form(&format!("/invite/{token}/accept"), "", Some(&mallory))
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert!(location(&response).starts_with(&format!("/invite/{token}?error=")));

	// Still pending for the right person.
	let page = json(t.get(&format!("/invite/{token}"), None).await).await;
	assert_eq!(page["invite"]["status"], "pending");
}

#[tokio::test]
async fn signup_rejects_blank_and_mismatched_email() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	let token = t.invite(&alice, &org_id, "frank@example.com", "member").await;
	let signup = format!("/invite/{token}/signup");

	let response = t.post_form(&signup, "email=", None).await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json(response).await["message"], "Email is required");

	let response = t
		.post_form(&signup, &email_form("someone@example.com"), None)
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json(response).await["message"],
		"Email does not match the invitation"
	);
	assert!(t.delivery.last_for("someone@example.com").is_none());
}

#[tokio::test]
async fn bad_magic_link_returns_to_invite_with_error() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	let token = t.invite(&alice, &org_id, "gina@example.com", "member").await;

	let response = t
		.get(
			&format!("/invite/{token}/accept?token=not-a-real-link&type=magiclink"),
			None,
		)
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(
		location(&response),
		format!("/invite/{token}?error=Invalid%20or%20expired%20magic%20link")
	);
	assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn members_cannot_invite() {
	let t = TestApp::new().await;
	let alice = t.sign_in("alice@example.com").await;
	let org_id = t.create_team(&alice, "Acme").await;
	let token = t.invite(&alice, &org_id, "hank@example.com", "member").await;
	let hank = t.sign_in("hank@example.com").await;
	let response = t
		.post_form(&format!("/invite/{token}/accept"), "", Some(&hank))
		.await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);

	let form = format!("{}&role=member", email_form("ivy@example.com"));
	let response = t
		.post_form(&format!("/team/{org_id}/invite"), &form, Some(&hank))
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json(response).await["message"],
		"Only owners and admins can invite members"
	);
}
