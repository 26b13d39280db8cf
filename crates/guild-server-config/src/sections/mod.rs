// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod auth;
mod database;
mod http;
mod invites;
mod logging;

pub use auth::{
	AuthConfig, AuthConfigLayer, AuthProviderKind, HostedAuthConfig, HostedAuthConfigLayer,
	DEFAULT_SESSION_COOKIE_NAME,
};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use invites::{InvitesConfig, InvitesConfigLayer, DEFAULT_INVITE_EXPIRY_DAYS};
pub use logging::{LoggingConfig, LoggingConfigLayer};
