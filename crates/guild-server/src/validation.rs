// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared validation for form fields and path ids.

use guild_server_auth::{is_valid_email, normalize_email, InviteId, OrgId, OrgRole};

use crate::error::ServerError;

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";

/// Trimmed, lowercased address, or a 400 when it is not an email.
pub fn parse_email(email: &str) -> Result<String, ServerError> {
	if !is_valid_email(email) {
		return Err(ServerError::BadRequest(INVALID_EMAIL_MESSAGE.to_string()));
	}
	Ok(normalize_email(email))
}

pub fn parse_org_id(id: &str) -> Result<OrgId, ServerError> {
	id.parse()
		.map_err(|_| ServerError::BadRequest("Invalid organization id".to_string()))
}

pub fn parse_invite_id(id: &str) -> Result<InviteId, ServerError> {
	id.parse()
		.map_err(|_| ServerError::BadRequest("Invalid invite id".to_string()))
}

pub fn parse_org_role(role: &str) -> Result<OrgRole, ServerError> {
	role
		.trim()
		.to_ascii_lowercase()
		.parse()
		.map_err(|_| ServerError::BadRequest(format!("Invalid role '{role}'")))
}

/// Trimmed organization name of 1..=100 characters.
pub fn parse_org_name(name: &str) -> Result<String, ServerError> {
	guild_server_auth::validate_org_name(name)
		.map_err(|msg| ServerError::BadRequest(msg.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn email_is_normalized() {
		assert_eq!(parse_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
		let err = parse_email("not an email").unwrap_err();
		assert_eq!(err.public_message(), INVALID_EMAIL_MESSAGE);
	}

	#[test]
	fn org_name_messages() {
		assert_eq!(
			parse_org_name("   ").unwrap_err().public_message(),
			"Organization name is required"
		);
		assert_eq!(
			parse_org_name(&"x".repeat(101)).unwrap_err().public_message(),
			"Organization name is too long"
		);
		assert_eq!(parse_org_name("  Acme  ").unwrap(), "Acme");
	}

	#[test]
	fn roles_parse_case_insensitively() {
		assert_eq!(parse_org_role("Admin").unwrap(), OrgRole::Admin);
		assert!(parse_org_role("superuser").is_err());
	}

	proptest! {
		#[test]
		fn generated_ids_parse(_seed in 0u8..16) {
			let id = OrgId::generate();
			prop_assert_eq!(parse_org_id(&id.to_string()).unwrap(), id);
		}

		#[test]
		fn garbage_ids_are_rejected(s in "[g-z]{1,40}") {
			prop_assert!(parse_org_id(&s).is_err());
			prop_assert!(parse_invite_id(&s).is_err());
		}
	}
}
