// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Login, signup and invite-signup forms.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EmailForm {
	#[serde(default)]
	pub email: String,
}

/// Query of `/auth/callback`: a magic-link token or an OAuth code.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
	pub token: Option<String>,
	#[serde(rename = "type")]
	pub token_type: Option<String>,
	pub code: Option<String>,
}

/// Query of `/auth/confirm`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmQuery {
	pub token_hash: Option<String>,
	#[serde(rename = "type")]
	pub token_type: Option<String>,
}
