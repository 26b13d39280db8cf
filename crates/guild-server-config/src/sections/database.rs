// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

const DEFAULT_DATABASE_URL: &str = "sqlite:./guild.db";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self
				.url
				.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_url() {
		assert_eq!(
			DatabaseConfigLayer::default().finalize().url,
			"sqlite:./guild.db"
		);
	}

	#[test]
	fn later_layer_wins() {
		let mut base = DatabaseConfigLayer {
			url: Some("sqlite:/var/lib/guild/a.db".to_string()),
		};
		base.merge(DatabaseConfigLayer {
			url: Some("sqlite:/var/lib/guild/b.db".to_string()),
		});
		assert_eq!(base.finalize().url, "sqlite:/var/lib/guild/b.db");
	}
}
