// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading credentials from the environment.
//!
//! Every secret setting can be given either inline (`VAR=value`) or as a file
//! reference (`VAR_FILE=/run/secrets/value`), the convention used by Docker and
//! Kubernetes secret mounts. The file form wins when both are present.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;

pub use guild_common_secret::{Secret, SecretString, REDACTED};

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },

	#[error("required secret not found: set either {var} or {var}_FILE")]
	Missing { var: String },
}

/// Read `var` from the environment, preferring the `{var}_FILE` indirection.
///
/// A single trailing newline is stripped from file contents. Empty inline values
/// count as unset.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.trim().is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
		_ => Ok(None),
	}
}

/// Like [`load_secret_env`] but fails when neither form is set.
pub fn require_secret_env(var: &str) -> Result<SecretString, SecretEnvError> {
	load_secret_env(var)?.ok_or_else(|| SecretEnvError::Missing {
		var: var.to_string(),
	})
}
