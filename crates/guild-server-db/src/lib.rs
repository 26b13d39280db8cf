// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Guild server.
//!
//! Each table family has a `*Repository` over a shared [`SqlitePool`] and a
//! matching `*Store` trait, so callers can depend on the trait and tests can
//! substitute fakes.
//!
//! [`SqlitePool`]: sqlx::SqlitePool

pub mod error;
pub mod identity;
pub mod invite;
pub mod migrations;
pub mod org;
pub mod pool;
pub mod profile;
mod row;
pub mod session;
pub mod testing;

pub use error::{DbError, Result};
pub use identity::{UserRepository, UserStore};
pub use invite::{
	AcceptedInvite, AutoAcceptedInvite, CreatedInvite, InviteDetails, InviteRepository, InviteStore,
};
pub use migrations::run_migrations;
pub use org::{OrgRepository, OrgStore};
pub use pool::{create_pool, ping};
pub use profile::{ProfileRepository, ProfileStore};
pub use session::{SessionRepository, SessionStore};
pub use sqlx::SqlitePool;
