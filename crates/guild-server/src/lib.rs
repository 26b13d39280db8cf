// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Guild server.
//!
//! HTTP server for organizations, memberships and email invitations, with
//! magic-link sign-in through a pluggable authentication provider.

pub mod api;
pub mod auth_middleware;
pub mod error;
pub mod invite_flow;
pub mod local_auth;
pub mod routes;
pub mod testing;
pub mod validation;

pub use api::{
	create_app_state, create_app_state_with_delivery, create_app_state_with_provider,
	create_router, ApiDoc, AppState,
};
pub use error::ServerError;
pub use guild_server_config::ServerConfig;
pub use invite_flow::{FlowOutcome, InviteFlow};
pub use local_auth::{LinkDelivery, LocalAuthProvider, LogDelivery};
