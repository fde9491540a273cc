// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::checkout::{CheckoutService, PaymentSignatureVerifier};
use crate::providers::{CreateOrderRequest, GatewayError, GatewayOrder, PaymentGateway};
use crate::state::AppState;
use crate::storage::database::test_support::temp_db;

pub const TEST_GATEWAY_SECRET: &str = "test_key_secret";

/// In-memory gateway that records requests and hands out sequential order ids.
#[derive(Default)]
pub struct FakeGateway {
    next_id: AtomicU64,
    requests: Mutex<Vec<CreateOrderRequest>>,
    failure: Mutex<Option<GatewayError>>,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Make the next `create_order` call fail with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = GatewayOrder {
            id: format!("order_fake{n}"),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
            status: "created".to_string(),
        };
        self.requests.lock().unwrap().push(request);
        Ok(order)
    }

    fn key_id(&self) -> &str {
        "rzp_test_fake"
    }
}

/// App state over a temp database and a [`FakeGateway`], without JWKS.
pub fn test_state() -> (AppState, tempfile::TempDir) {
    let (db, dir) = temp_db();
    let db = Arc::new(db);
    let checkout = CheckoutService::new(
        db.clone(),
        Arc::new(FakeGateway::default()),
        PaymentSignatureVerifier::new(TEST_GATEWAY_SECRET),
        "INR",
        Duration::from_secs(3600),
    );
    (AppState::new(db, Arc::new(checkout)), dir)
}
