// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication and organization domain for Guild.
//!
//! This crate provides:
//! - Id newtypes, organization roles and invite status
//! - Organizations, memberships, invites and profiles
//! - The [`AuthProvider`] seam and request [`AuthContext`]
//! - Session and invite token generation and hashing
//!
//! Invite and session tokens are stored as SHA-256 digests (see [`hash_token`]);
//! magic-link tokens use Argon2id (see [`magic_link`]).

pub mod middleware;
pub mod org;
pub mod provider;
pub mod session;
pub mod types;
pub mod user;

pub mod magic_link {
	//! Re-export magic link types from guild-server-auth-magiclink.
	pub use guild_server_auth_magiclink::*;
}

pub use guild_common_secret::SecretString;
pub use middleware::{
	extract_session_cookie_with_name, AuthContext, AuthRequired, CurrentUser, SessionCookie,
};
pub use org::{
	generate_invite_token, validate_org_name, OrgInvite, OrgMembership, Organization, TeamMember,
	UserOrganization, INVITE_TOKEN_BYTES, ORG_NAME_MAX_CHARS,
};
pub use provider::{AuthProvider, AuthProviderError, OneTimeTokenType, ProviderSession};
pub use session::{generate_session_token, Session, SESSION_EXPIRY_DAYS};
pub use types::*;
pub use user::{emails_match, is_valid_email, normalize_email, Identity, UserProfile};

/// SHA-256 of `token`, hex encoded. Used for storage and lookup of invite and
/// session tokens.
pub fn hash_token(token: &str) -> String {
	use sha2::{Digest, Sha256};
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn hash_token_known_vector() {
		assert_eq!(
			hash_token("abc"),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
	}

	proptest! {
		#[test]
		fn hash_token_is_deterministic_hex(token in "[ -~]{0,64}") {
			let a = hash_token(&token);
			prop_assert_eq!(a.len(), 64);
			prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
			prop_assert_eq!(a, hash_token(&token));
		}
	}
}
