// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and the HTTP router.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post},
	Json, Router,
};
use guild_server_auth::{AuthProvider, SessionCookie};
use guild_server_auth_hosted::HostedAuthProvider;
use guild_server_config::{AuthConfig, AuthProviderKind, ServerConfig};
use guild_server_db::{
	InviteRepository, InviteStore, OrgRepository, OrgStore, ProfileRepository, ProfileStore,
	SessionRepository, UserRepository,
};
use sqlx::SqlitePool;
use utoipa::OpenApi;

use crate::{
	auth_middleware::auth_layer,
	error::ServerError,
	invite_flow::InviteFlow,
	local_auth::{LinkDelivery, LocalAuthProvider, LogDelivery},
	routes,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub orgs: Arc<dyn OrgStore>,
	pub invites: Arc<dyn InviteStore>,
	pub profiles: Arc<dyn ProfileStore>,
	pub auth_provider: Arc<dyn AuthProvider>,
	pub invite_flow: InviteFlow,
	pub auth_config: AuthConfig,
	pub session_cookie: SessionCookie,
	/// Public origin without a trailing slash.
	pub base_url: String,
	pub invite_expiry: chrono::Duration,
}

impl AppState {
	/// Absolute URL for `path` on this server.
	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}
}

/// Build state with the provider selected by `config.auth.provider`.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let provider: Arc<dyn AuthProvider> = match config.auth.provider {
		AuthProviderKind::Local => local_provider(
			&pool,
			config,
			Arc::new(LogDelivery {
				dev_mode: config.auth.dev_mode,
			}),
		),
		AuthProviderKind::Hosted => {
			let hosted = config.hosted_auth.as_ref().ok_or_else(|| {
				ServerError::Internal("hosted auth selected without hosted_auth settings".to_string())
			})?;
			Arc::new(HostedAuthProvider::new(&hosted.url, hosted.api_key.clone())?)
		}
	};

	tracing::info!(provider = %config.auth.provider, "auth provider configured");
	Ok(create_app_state_with_provider(pool, config, provider))
}

/// Local provider with a caller-supplied link delivery.
pub fn create_app_state_with_delivery(
	pool: SqlitePool,
	config: &ServerConfig,
	delivery: Arc<dyn LinkDelivery>,
) -> AppState {
	let provider = local_provider(&pool, config, delivery);
	create_app_state_with_provider(pool, config, provider)
}

pub fn create_app_state_with_provider(
	pool: SqlitePool,
	config: &ServerConfig,
	auth_provider: Arc<dyn AuthProvider>,
) -> AppState {
	let orgs: Arc<dyn OrgStore> = Arc::new(OrgRepository::new(pool.clone()));
	let invites: Arc<dyn InviteStore> = Arc::new(InviteRepository::new(pool.clone()));
	let profiles: Arc<dyn ProfileStore> = Arc::new(ProfileRepository::new(pool.clone()));
	let invite_flow = InviteFlow::new(invites.clone(), profiles.clone(), auth_provider.clone());

	AppState {
		pool,
		orgs,
		invites,
		profiles,
		auth_provider,
		invite_flow,
		auth_config: config.auth.clone(),
		session_cookie: SessionCookie::new(
			config.auth.session_cookie_name.clone(),
			config.auth.secure_cookies,
		),
		base_url: config.http.base_url.trim_end_matches('/').to_string(),
		invite_expiry: chrono::Duration::days(config.invites.expiry_days),
	}
}

fn local_provider(
	pool: &SqlitePool,
	config: &ServerConfig,
	delivery: Arc<dyn LinkDelivery>,
) -> Arc<dyn AuthProvider> {
	Arc::new(LocalAuthProvider::new(
		Arc::new(UserRepository::new(pool.clone())),
		Arc::new(SessionRepository::new(pool.clone())),
		delivery,
		config.auth.signups_disabled,
	))
}

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health_check,
		routes::auth::login,
		routes::auth::signup,
		routes::auth::callback,
		routes::auth::confirm,
		routes::auth::logout,
		routes::invite::view_invite,
		routes::invite::accept_invite,
		routes::invite::accept_after_verification,
		routes::invite::signup_for_invite,
		routes::team::team_index,
		routes::team::create_team_page,
		routes::team::create_team,
		routes::team::team_page,
		routes::team::invite_member,
		routes::team::update_team,
		routes::team::revoke_invite,
		routes::check_invites::check_invites,
		routes::logs::ingest_client_log,
	),
	components(schemas(
		guild_server_api::ErrorResponse,
		guild_server_api::ActionResponse,
		guild_server_api::HealthResponse,
		guild_server_api::EmailForm,
		guild_server_api::InvitePageContext,
		guild_server_api::InviteSummary,
		guild_server_api::CreateInviteForm,
		guild_server_api::CreateInviteResponse,
		guild_server_api::PendingInviteResponse,
		guild_server_api::CheckInvitesResponse,
		guild_server_api::JoinedOrganizationResponse,
		guild_server_api::ClientLogEntry,
		guild_server_api::OrgNameForm,
		guild_server_api::TeamPageContext,
		guild_server_api::CreateTeamPageContext,
		guild_server_api::UpdateOrganizationResponse,
	)),
	tags(
		(name = "health", description = "Liveness"),
		(name = "auth", description = "Magic-link sign-in and sessions"),
		(name = "invites", description = "Invite acceptance"),
		(name = "teams", description = "Organizations, members and invites"),
		(name = "api", description = "JSON endpoints used by the web client"),
	)
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
	Json(ApiDoc::openapi())
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/openapi.json", get(openapi_json))
		// Auth
		.route("/auth/login", post(routes::auth::login))
		.route("/auth/signup", post(routes::auth::signup))
		.route("/auth/callback", get(routes::auth::callback))
		.route("/auth/confirm", get(routes::auth::confirm))
		.route("/auth/logout", post(routes::auth::logout))
		// Invites
		.route("/invite/{token}", get(routes::invite::view_invite))
		.route(
			"/invite/{token}/accept",
			get(routes::invite::accept_after_verification).post(routes::invite::accept_invite),
		)
		.route("/invite/{token}/signup", post(routes::invite::signup_for_invite))
		// Teams
		.route("/team", get(routes::team::team_index))
		.route(
			"/team/create",
			get(routes::team::create_team_page).post(routes::team::create_team),
		)
		.route("/team/{org_id}", get(routes::team::team_page))
		.route("/team/{org_id}/invite", post(routes::team::invite_member))
		.route("/team/{org_id}/update", post(routes::team::update_team))
		.route(
			"/team/{org_id}/invites/{invite_id}/revoke",
			post(routes::team::revoke_invite),
		)
		// API
		.route("/api/check-invites", post(routes::check_invites::check_invites))
		.route("/api/logs", post(routes::logs::ingest_client_log))
		.layer(from_fn_with_state(state.clone(), auth_layer))
		.with_state(state)
}
