// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Clerk JWT authentication and role-based authorization.
//!
//! ## Auth Flow
//!
//! 1. The frontend signs the user in with Clerk
//! 2. Requests carry `Authorization: Bearer <Clerk JWT>`
//! 3. The server:
//!    - verifies signature, expiry, issuer and audience against Clerk's JWKS
//!    - maps `sub` to the local account (`external_id`)
//!    - authorizes with the capabilities of the *local* account's role
//!
//! ## Security
//!
//! - Without `CLERK_JWKS_URL`, release builds reject every token; only
//!   builds with the `dev` feature decode tokens without verification
//! - JWKS is cached with TTL and refetched on unknown `kid`
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use directory::{ClerkDirectory, DirectoryError, DirectoryProfile};
pub use error::AuthError;
pub use extractor::{Auth, CourseAuthor, CurrentAccount, PlatformAdmin};
pub use jwks::JwksManager;
pub use roles::{Capability, Role};
