// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the Guild server.
//!
//! Sources are merged in precedence order: built-in defaults, then a TOML
//! file (`/etc/guild/server.toml` unless overridden), then `GUILD_SERVER_*`
//! environment variables.
//!
//! ```ignore
//! use guild_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub auth: AuthConfig,
	pub hosted_auth: Option<HostedAuthConfig>,
	pub invites: InvitesConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with the system config file.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer into a validated [`ServerConfig`].
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		auth: layer.auth.unwrap_or_default().finalize(),
		hosted_auth: layer.hosted_auth.and_then(|l| l.finalize()),
		invites: layer.invites.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		base_url = %config.http.base_url,
		database = %config.database.url,
		auth_provider = %config.auth.provider,
		dev_mode = config.auth.dev_mode,
		signups_disabled = config.auth.signups_disabled,
		invite_expiry_days = config.invites.expiry_days,
		"Server configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	let auth = &config.auth;
	if auth.dev_mode && auth.environment == "production" {
		return Err(ConfigError::Validation(
			"GUILD_SERVER_AUTH_DEV_MODE=1 is set while GUILD_SERVER_ENV=production. \
			 This is a security risk. Remove GUILD_SERVER_AUTH_DEV_MODE or set GUILD_SERVER_ENV \
			 to a non-production value."
				.to_string(),
		));
	}

	if auth.provider == AuthProviderKind::Hosted && config.hosted_auth.is_none() {
		return Err(ConfigError::Validation(
			"GUILD_SERVER_AUTH_PROVIDER=hosted requires GUILD_SERVER_HOSTED_AUTH_URL and \
			 GUILD_SERVER_HOSTED_AUTH_API_KEY"
				.to_string(),
		));
	}

	if config.invites.expiry_days < 1 {
		return Err(ConfigError::InvalidValue {
			key: "invites.expiry_days".to_string(),
			message: format!("must be at least 1, got {}", config.invites.expiry_days),
		});
	}

	Ok(())
}
