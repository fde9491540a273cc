// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment gateway port and its Razorpay adapter.

pub mod razorpay;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use razorpay::RazorpayClient;

/// Order to open at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    /// Minor currency units (paise)
    pub amount_minor: u64,
    pub currency: String,
    pub receipt: String,
    /// Free-form key/value pairs stored with the gateway order
    pub notes: BTreeMap<String, String>,
}

/// Order as acknowledged by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount_minor: u64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway configuration missing: {0}")]
    MissingConfig(String),

    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway rejected the order ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway response was invalid: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Public key id handed to the client to open checkout.
    fn key_id(&self) -> &str;
}
