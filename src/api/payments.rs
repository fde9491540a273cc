// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Checkout and payment verification endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::CurrentAccount,
    checkout::{EnrollmentReceipt, OrderQuote, VerifyPayment},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default, alias = "courseIds")]
    pub course_ids: Vec<String>,
}

/// Price the selected courses and open a payment order.
///
/// Prices come from the catalog; nothing the client sends about amounts is
/// used. No enrollment happens here.
#[utoipa::path(
    post,
    path = "/v1/payments/checkout",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order opened", body = OrderQuote),
        (status = 400, description = "Empty or invalid order"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Order could not be opened; no payment taken"),
        (status = 503, description = "Payment gateway unavailable")
    )
)]
pub async fn checkout(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<OrderQuote>, ApiError> {
    let quote = state.checkout.create_order(&account, &request.course_ids).await?;
    Ok(Json(quote))
}

/// Verify a completed payment and enroll the caller.
///
/// Safe to retry: a replay of an enrolled order succeeds with
/// `already_processed`.
#[utoipa::path(
    post,
    path = "/v1/payments/verify",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = VerifyPayment,
    responses(
        (status = 200, description = "Enrollment committed", body = EnrollmentReceipt),
        (status = 400, description = "Incomplete payload or invalid signature"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Order belongs to another account"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Enrollment could not be saved; retry")
    )
)]
pub async fn verify_payment(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Json(payment): Json<VerifyPayment>,
) -> Result<Json<EnrollmentReceipt>, ApiError> {
    let receipt = state
        .checkout
        .verify_and_enroll(&account, payment)
        .inspect_err(|e| {
            if e.is_retryable() {
                tracing::warn!(account_id = %account.id, error = %e, "Verification failed; client may retry");
            }
        })?;
    Ok(Json(receipt))
}
