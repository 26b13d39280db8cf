// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file, and environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use guild_common_config::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, AuthProviderKind, DatabaseConfigLayer, HostedAuthConfigLayer,
	HttpConfigLayer, InvitesConfigLayer, LoggingConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/guild/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `GUILD_SERVER_<FIELD>`, with secrets also accepted as `<VAR>_FILE`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()),
			auth: Some(load_auth_from_env()?),
			hosted_auth: Some(load_hosted_auth_from_env()?),
			invites: Some(load_invites_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

/// Parse a variable into `T`, naming the variable and the expected type on failure.
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	env_var(name)
		.map(|v| {
			v.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
			})
		})
		.transpose()
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("GUILD_SERVER_HOST"),
		port: env_parse("GUILD_SERVER_PORT")?,
		base_url: env_var("GUILD_SERVER_BASE_URL"),
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("GUILD_SERVER_DATABASE_URL"),
	}
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	let provider = match env_var("GUILD_SERVER_AUTH_PROVIDER") {
		Some(v) => Some(v.parse::<AuthProviderKind>().map_err(|message| {
			ConfigError::InvalidValue {
				key: "GUILD_SERVER_AUTH_PROVIDER".to_string(),
				message,
			}
		})?),
		None => None,
	};

	Ok(AuthConfigLayer {
		provider,
		dev_mode: env_bool("GUILD_SERVER_AUTH_DEV_MODE"),
		environment: env_var("GUILD_SERVER_ENV"),
		session_cookie_name: env_var("GUILD_SERVER_SESSION_COOKIE_NAME"),
		secure_cookies: env_bool("GUILD_SERVER_SECURE_COOKIES"),
		signups_disabled: env_bool("GUILD_SERVER_SIGNUPS_DISABLED"),
	})
}

fn load_hosted_auth_from_env() -> Result<HostedAuthConfigLayer, ConfigError> {
	Ok(HostedAuthConfigLayer {
		url: env_var("GUILD_SERVER_HOSTED_AUTH_URL"),
		api_key: load_secret_env("GUILD_SERVER_HOSTED_AUTH_API_KEY")?,
	})
}

fn load_invites_from_env() -> Result<InvitesConfigLayer, ConfigError> {
	Ok(InvitesConfigLayer {
		expiry_days: env_parse("GUILD_SERVER_INVITE_EXPIRY_DAYS")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("GUILD_SERVER_LOG_LEVEL"),
	}
}
