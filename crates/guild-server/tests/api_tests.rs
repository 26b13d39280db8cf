// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the JSON API and the session-guarded team routes.

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

async fn setup_test_app() -> (Router, Arc<RecordingDelivery>, TempDir) {
	let dir = tempdir().unwrap();
	let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("api.db").display());
	let pool = guild_server_db::create_pool(&db_url).await.unwrap();
	guild_server_db::run_migrations(&pool).await.unwrap();
	let delivery = Arc::new(RecordingDelivery::default());
	let state = create_app_state_with_delivery(pool, &ServerConfig::default(), delivery.clone());
	(create_router(state), delivery, dir)
}

async fn json(response: Response<Body>) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, content_type: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri(uri)
		.header(CONTENT_TYPE, content_type);
	if let Some(cookie) = cookie {
		builder = builder.header(COOKIE, cookie);
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder().uri(uri);
	if let Some(cookie) = cookie {
		builder = builder.header(COOKIE, cookie);
	}
	builder.body(Body::empty()).unwrap()
}

const FORM: &str = "application/x-www-form-urlencoded";

async fn sign_in(app: &Router, delivery: &RecordingDelivery, email: &str) -> String {
	let form = format!("email={}", urlencoding::encode(email));
	let response = app
		.clone()
		.oneshot(post("/auth/login", FORM, &form, None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let link = url::Url::parse(&delivery.last_for(email).unwrap()).unwrap();
	let uri = format!("{}?{}", link.path(), link.query().unwrap());
	let response = app.clone().oneshot(get(&uri, None)).await.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	response.headers()[SET_COOKIE]
		.to_str()
		.unwrap()
		.split(';')
		.next()
		.unwrap()
		.to_string()
}

// ============================================================================
// Health and docs
// ============================================================================

#[tokio::test]
async fn health_reports_ok_with_version() {
	let (app, _, _dir) = setup_test_app().await;
	let response = app.oneshot(get("/health", None)).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = json(response).await;
	assert_eq!(body["status"], "ok");
	assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn openapi_lists_invite_routes() {
	let (app, _, _dir) = setup_test_app().await;
	let response = app.oneshot(get("/api/openapi.json", None)).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = json(response).await;
	assert!(body["paths"].get("/invite/{token}").is_some());
	assert!(body["paths"].get("/api/check-invites").is_some());
	assert!(body["paths"]["/team/create"].get("get").is_some());
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn login_rejects_invalid_email() {
	let (app, delivery, _dir) = setup_test_app().await;
	let response = app
		.oneshot(post("/auth/login", FORM, "email=not-an-email", None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json(response).await["message"],
		"Please enter a valid email address"
	);
	assert_eq!(delivery.count(), 0);
}

#[tokio::test]
async fn callback_with_bad_token_returns_to_login() {
	let (app, _, _dir) = setup_test_app().await;
	let response = app
		.oneshot(get("/auth/callback?token=nope&type=magiclink", None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	let location = response.headers()[LOCATION].to_str().unwrap();
	assert!(location.starts_with("/auth/login?error="));
}

#[tokio::test]
async fn logout_clears_the_session() {
	let (app, delivery, _dir) = setup_test_app().await;
	let cookie = sign_in(&app, &delivery, "alice@example.com").await;

	let response = app
		.clone()
		.oneshot(post("/auth/logout", FORM, "", Some(&cookie)))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(response.headers()[LOCATION], "/auth/login");

	let response = app.oneshot(get("/team", Some(&cookie))).await.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(response.headers()[LOCATION], "/auth/login");
}

// ============================================================================
// Teams
// ============================================================================

#[tokio::test]
async fn team_routes_redirect_when_signed_out() {
	let (app, _, _dir) = setup_test_app().await;
	for uri in ["/team", "/team/create"] {
		let response = app.clone().oneshot(get(uri, None)).await.unwrap();
		assert_eq!(response.status(), StatusCode::SEE_OTHER, "uri: {uri}");
		assert_eq!(response.headers()[LOCATION], "/auth/login");
	}
}

#[tokio::test]
async fn new_user_is_sent_to_create_then_to_their_team() {
	let (app, delivery, _dir) = setup_test_app().await;
	let cookie = sign_in(&app, &delivery, "alice@example.com").await;

	let response = app.clone().oneshot(get("/team", Some(&cookie))).await.unwrap();
	assert_eq!(response.headers()[LOCATION], "/team/create");

	let response = app
		.clone()
		.oneshot(get("/team/create", Some(&cookie)))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json(response).await, serde_json::json!({}));

	let response = app
		.clone()
		.oneshot(post("/team/create", FORM, "name=++", Some(&cookie)))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json(response).await["message"], "Organization name is required");

	let response = app
		.clone()
		.oneshot(post("/team/create", FORM, "name=Acme", Some(&cookie)))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	let created = response.headers()[LOCATION].to_str().unwrap().to_string();
	let org_path = created.trim_end_matches("?created=true").to_string();

	let response = app.clone().oneshot(get("/team", Some(&cookie))).await.unwrap();
	assert_eq!(response.headers()[LOCATION].to_str().unwrap(), org_path);

	let response = app
		.clone()
		.oneshot(post(
			&format!("{org_path}/update"),
			FORM,
			"name=Acme+Labs",
			Some(&cookie),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = json(response).await;
	assert_eq!(body["updateSuccess"], true);
	assert_eq!(body["message"], "Organization name updated successfully");

	let page = json(app.oneshot(get(&org_path, Some(&cookie))).await.unwrap()).await;
	assert_eq!(page["currentOrganization"]["name"], "Acme Labs");
	assert_eq!(page["organizations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn non_members_are_redirected_away_from_a_team() {
	let (app, delivery, _dir) = setup_test_app().await;
	let alice = sign_in(&app, &delivery, "alice@example.com").await;
	let response = app
		.clone()
		.oneshot(post("/team/create", FORM, "name=Acme", Some(&alice)))
		.await
		.unwrap();
	let org_path = response.headers()[LOCATION]
		.to_str()
		.unwrap()
		.trim_end_matches("?created=true")
		.to_string();

	let bob = sign_in(&app, &delivery, "bob@example.com").await;
	let response = app.clone().oneshot(get(&org_path, Some(&bob))).await.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(response.headers()[LOCATION], "/team");

	let response = app
		.oneshot(post(
			&format!("{org_path}/update"),
			FORM,
			"name=Mine",
			Some(&bob),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// API
// ============================================================================

#[tokio::test]
async fn check_invites_requires_a_session() {
	let (app, _, _dir) = setup_test_app().await;
	let response = app
		.oneshot(post("/api/check-invites", "application/json", "", None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn check_invites_accepts_pending_invites_for_the_caller() {
	let (app, delivery, _dir) = setup_test_app().await;
	let alice = sign_in(&app, &delivery, "alice@example.com").await;
	let response = app
		.clone()
		.oneshot(post("/team/create", FORM, "name=Acme", Some(&alice)))
		.await
		.unwrap();
	let org_path = response.headers()[LOCATION]
		.to_str()
		.unwrap()
		.trim_end_matches("?created=true")
		.to_string();
	let response = app
		.clone()
		.oneshot(post(
			&format!("{org_path}/invite"),
			FORM,
			"email=bob%40example.com&role=member",
			Some(&alice),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let bob = sign_in(&app, &delivery, "bob@example.com").await;
	let response = app
		.clone()
		.oneshot(post("/api/check-invites", "application/json", "", Some(&bob)))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = json(response).await;
	assert_eq!(body["success"], true);
	assert_eq!(body["acceptedCount"], 1);
	assert_eq!(body["invites"][0]["organizationName"], "Acme");
	assert_eq!(body["invites"][0]["role"], "member");

	// Nothing left to accept.
	let response = app
		.oneshot(post("/api/check-invites", "application/json", "", Some(&bob)))
		.await
		.unwrap();
	assert_eq!(json(response).await["acceptedCount"], 0);
}

#[tokio::test]
async fn logs_reject_incomplete_entries() {
	let (app, _, _dir) = setup_test_app().await;
	for body in [r#"{"message":"boom"}"#, r#"{"level":"error","message":""}"#, "not json"] {
		let response = app
			.clone()
			.oneshot(post("/api/logs", "application/json", body, None))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
		assert_eq!(json(response).await["error"], "Invalid log entry");
	}
}

#[tokio::test]
async fn logs_accept_entries_at_any_level() {
	let (app, _, _dir) = setup_test_app().await;
	let body = r#"{"level":"warn","message":"slow render","environment":"test","context":{"page":"/team"}}"#;
	let response = app
		.oneshot(post("/api/logs", "application/json", body, None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json(response).await["success"], true);
}
