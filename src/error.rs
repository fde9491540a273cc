// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::checkout::CheckoutError;
use crate::identity::IdentityError;
use crate::storage::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StoreError::AlreadyExists(what) => ApiError::conflict(format!("{what} already exists")),
            StoreError::Conflict(reason) => ApiError::conflict(reason),
            StoreError::Invalid(reason) => ApiError::bad_request(reason),
            StoreError::PermissionDenied { .. } => {
                ApiError::forbidden("You do not have permission to modify this resource")
            }
            other => {
                tracing::error!(error = %other, retryable = other.is_unavailable(), "Storage failure");
                ApiError::internal("Storage failure; please retry")
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            CheckoutError::InvalidOrder(_)
            | CheckoutError::InvalidPaymentPayload(_)
            | CheckoutError::InvalidSignature
            | CheckoutError::AmountOverflow => ApiError::bad_request(err.to_string()),
            CheckoutError::Forbidden(_) => ApiError::forbidden(err.to_string()),
            CheckoutError::Gateway(_) => {
                ApiError::service_unavailable("Payment gateway unavailable; please retry")
            }
            CheckoutError::OrderStorage(_) => {
                ApiError::internal("Payment failed: the order could not be opened; please retry")
            }
            CheckoutError::Persistence(_) => {
                ApiError::internal("Payment received but enrollment could not be saved; please retry")
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingEmail => ApiError::bad_request(err.to_string()),
            IdentityError::RoleNotPermitted(_) => ApiError::forbidden(err.to_string()),
            IdentityError::Directory(e) => {
                tracing::warn!(error = %e, "Identity provider lookup failed");
                ApiError::service_unavailable("Identity provider unavailable; please retry")
            }
            IdentityError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::new(err.status_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
