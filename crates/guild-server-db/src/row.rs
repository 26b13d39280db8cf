// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column conversions shared by the repositories.
//!
//! Timestamps are stored as RFC 3339 text with microsecond precision and a `Z`
//! suffix, so string comparison in SQL orders them correctly.

use chrono::{DateTime, SecondsFormat, Utc};
use std::str::FromStr;

use crate::error::DbError;

pub(crate) fn ts(dt: DateTime<Utc>) -> String {
	dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn parse_opt_ts(
	value: Option<String>,
	column: &str,
) -> Result<Option<DateTime<Utc>>, DbError> {
	value.map(|v| parse_ts(&v, column)).transpose()
}

/// Parse an id or enum column through its `FromStr` impl.
pub(crate) fn parse_col<T>(value: &str, column: &str) -> Result<T, DbError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	value
		.parse()
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}
