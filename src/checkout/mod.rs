// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Checkout
//!
//! Quoting an order and turning a verified payment into enrollments.
//!
//! ## Payment lifecycle
//!
//! ```text
//! Quoted ──► PaymentReceived ──► Verified ──► Enrolled
//!                  │                 │
//!                  └──────┬──────────┘
//!                         ▼
//!                      Rejected
//! ```
//!
//! `Quoted` is persisted (the quote record). The intermediate states exist
//! only within one verify call and are logged on each transition.

pub mod error;
pub mod pricing;
pub mod service;
pub mod signature;

pub use error::CheckoutError;
pub use pricing::{platform_fee, price_courses, PriceBreakdown, PLATFORM_FEE_PERCENT};
pub use service::{CheckoutService, EnrollmentReceipt, OrderQuote, VerifyPayment};
pub use signature::PaymentSignatureVerifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Quoted,
    PaymentReceived,
    Verified,
    Enrolled,
    Rejected,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Quoted => "quoted",
            PaymentState::PaymentReceived => "payment_received",
            PaymentState::Verified => "verified",
            PaymentState::Enrolled => "enrolled",
            PaymentState::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
