// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test support: a link delivery that records what would have been emailed.

use std::sync::Mutex;

use async_trait::async_trait;
use guild_server_auth::{AuthProviderError, SecretString};

use crate::local_auth::LinkDelivery;

#[derive(Debug, Default)]
pub struct RecordingDelivery {
	sent: Mutex<Vec<(String, String)>>,
}

impl RecordingDelivery {
	/// Most recent link delivered to `email`.
	pub fn last_for(&self, email: &str) -> Option<String> {
		self
			.sent
			.lock()
			.expect("delivery log poisoned")
			.iter()
			.rev()
			.find(|(to, _)| to == email)
			.map(|(_, link)| link.clone())
	}

	pub fn count(&self) -> usize {
		self.sent.lock().expect("delivery log poisoned").len()
	}

	/// The `token` query parameter of a delivered link.
	pub fn token_of(link: &str) -> Option<String> {
		let url = url::Url::parse(link).ok()?;
		url
			.query_pairs()
			.find(|(k, _)| k == "token")
			.map(|(_, v)| v.into_owned())
	}
}

#[async_trait]
impl LinkDelivery for RecordingDelivery {
	async fn deliver(&self, email: &str, link: &SecretString) -> Result<(), AuthProviderError> {
		self
			.sent
			.lock()
			.expect("delivery log poisoned")
			.push((email.to_string(), link.expose().clone()));
		Ok(())
	}
}
