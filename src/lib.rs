// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Course Marketplace - catalog, checkout and enrollment service
//!
//! Instructors publish courses; students buy them through the payment
//! gateway. Prices are computed on the server, payment reports are checked
//! against the gateway's HMAC signature, and a verified payment enrolls the
//! buyer in one storage transaction.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Authentication and capabilities (Clerk JWT)
//! - `checkout` - Pricing, signature verification, enrollment workflow
//! - `identity` - Mapping verified identities to local accounts
//! - `providers` - Payment gateway port and Razorpay client
//! - `storage` - Embedded database (redb), repositories, audit log

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod error;
pub mod identity;
pub mod providers;
pub mod quote_sweeper;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
