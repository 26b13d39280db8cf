// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identities and user profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// An authenticated principal as reported by the auth provider.
///
/// Identities are derived per request from a session or a one-time token and
/// are not stored by the invite flow. The email always comes from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub id: UserId,
	pub email: String,
}

impl Identity {
	pub fn new(id: UserId, email: &str) -> Self {
		Self {
			id,
			email: normalize_email(email),
		}
	}
}

/// Application-side user record. At most one per identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	pub id: UserId,
	pub email: String,
	pub full_name: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl UserProfile {
	pub fn for_identity(identity: &Identity) -> Self {
		Self {
			id: identity.id,
			email: identity.email.clone(),
			full_name: None,
			created_at: Utc::now(),
		}
	}
}

pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

pub fn emails_match(a: &str, b: &str) -> bool {
	normalize_email(a) == normalize_email(b)
}

/// Loose structural check: one `@`, non-empty local part, and a dotted domain
/// without whitespace.
pub fn is_valid_email(email: &str) -> bool {
	let email = email.trim();
	if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
		return false;
	}
	let Some((local, domain)) = email.split_once('@') else {
		return false;
	};
	if local.is_empty() || domain.contains('@') {
		return false;
	}
	let labels: Vec<&str> = domain.split('.').collect();
	labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn identity_email_is_normalized() {
		let identity = Identity::new(UserId::generate(), " Alice@Example.COM ");
		assert_eq!(identity.email, "alice@example.com");
	}

	#[test]
	fn profile_copies_identity() {
		let identity = Identity::new(UserId::generate(), "a@x.com");
		let profile = UserProfile::for_identity(&identity);
		assert_eq!(profile.id, identity.id);
		assert_eq!(profile.email, "a@x.com");
		assert!(profile.full_name.is_none());
	}

	#[test]
	fn email_validation() {
		assert!(is_valid_email("a@x.com"));
		assert!(is_valid_email("first.last+tag@sub.example.org"));
		assert!(!is_valid_email(""));
		assert!(!is_valid_email("no-at-sign"));
		assert!(!is_valid_email("@x.com"));
		assert!(!is_valid_email("a@localhost"));
		assert!(!is_valid_email("a@x..com"));
		assert!(!is_valid_email("a b@x.com"));
		assert!(!is_valid_email("a@b@x.com"));
	}

	proptest! {
		#[test]
		fn normalization_is_idempotent(email in "[ ]{0,2}[A-Za-z0-9._]{1,12}@[A-Za-z]{1,8}\\.[A-Za-z]{2,4}[ ]{0,2}") {
			let once = normalize_email(&email);
			prop_assert_eq!(normalize_email(&once), once.clone());
			prop_assert!(emails_match(&email, &once));
			prop_assert!(is_valid_email(&email));
		}
	}
}
