// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Browser log entries forwarded to `POST /api/logs`.

use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClientLogEntry {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub timestamp: Option<String>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	#[schema(value_type = Option<Object>)]
	pub client: Option<serde_json::Value>,
	#[serde(default)]
	#[schema(value_type = Option<Object>)]
	pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientLogLevel {
	Error,
	Warn,
	Info,
	Debug,
}

impl ClientLogLevel {
	/// Unknown levels are logged at `info`.
	pub fn parse(level: &str) -> Self {
		match level.trim().to_ascii_lowercase().as_str() {
			"error" => ClientLogLevel::Error,
			"warn" | "warning" => ClientLogLevel::Warn,
			"debug" | "trace" => ClientLogLevel::Debug,
			_ => ClientLogLevel::Info,
		}
	}

	pub fn prefix(&self) -> &'static str {
		match self {
			ClientLogLevel::Error => "[CLIENT-ERROR]",
			ClientLogLevel::Warn => "[CLIENT-WARN]",
			ClientLogLevel::Info => "[CLIENT-INFO]",
			ClientLogLevel::Debug => "[CLIENT-DEBUG]",
		}
	}
}

impl ClientLogEntry {
	/// Level and message, when both are present and non-blank.
	pub fn validated(&self) -> Option<(ClientLogLevel, &str)> {
		let level = self.level.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
		let message = self.message.as_deref().filter(|m| !m.trim().is_empty())?;
		Some((ClientLogLevel::parse(level), message))
	}
}
