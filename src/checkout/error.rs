// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::providers::GatewayError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid payment payload: {0}")]
    InvalidPaymentPayload(String),

    #[error("payment signature verification failed")]
    InvalidSignature,

    #[error("order {0} belongs to another account")]
    Forbidden(String),

    #[error("order amount overflows")]
    AmountOverflow,

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Storage failed while opening an order; no payment has been taken.
    #[error("order storage error: {0}")]
    OrderStorage(StoreError),

    /// Storage failed after a genuine payment was verified.
    #[error("persistence error: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CheckoutError::NotFound(what),
            other => CheckoutError::Persistence(other),
        }
    }
}

impl CheckoutError {
    /// Classify a store failure on the checkout path, before any payment.
    pub(crate) fn from_order_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CheckoutError::NotFound(what),
            other => CheckoutError::OrderStorage(other),
        }
    }

    /// The client may retry the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::Gateway(_) | CheckoutError::OrderStorage(_) | CheckoutError::Persistence(_)
        )
    }
}
