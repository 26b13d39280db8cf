// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
	pub error: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: None,
		}
	}

	pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: Some(message.into()),
		}
	}
}

/// `{success: true}` plus an optional message for the page to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ActionResponse {
	pub fn ok() -> Self {
		Self {
			success: true,
			message: None,
		}
	}

	pub fn with_message(message: impl Into<String>) -> Self {
		Self {
			success: true,
			message: Some(message.into()),
		}
	}
}

/// `error=` / `success=` carried on redirects.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageQuery {
	pub error: Option<String>,
	pub success: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
	pub status: String,
	pub version: String,
}
