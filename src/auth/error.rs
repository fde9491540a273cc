// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization rejections.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::roles::Capability;

#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header is not `Bearer <token>`
    InvalidAuthHeader,
    MalformedToken,
    InvalidSignature,
    TokenExpired,
    InvalidIssuer,
    InvalidAudience,
    TokenNotYetValid,
    /// No JWKS configured and insecure decoding is not compiled in
    VerificationUnavailable,
    JwksFetchError(String),
    NoMatchingKey,
    /// Verified identity has no local account yet
    AccountNotSynced,
    /// Local account lacks the capability
    MissingCapability(Capability),
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::VerificationUnavailable => "verification_unavailable",
            AuthError::JwksFetchError(_) => "jwks_fetch_error",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::AccountNotSynced => "account_not_synced",
            AuthError::MissingCapability(_) => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidIssuer
            | AuthError::InvalidAudience
            | AuthError::TokenNotYetValid
            | AuthError::NoMatchingKey => StatusCode::UNAUTHORIZED,
            AuthError::AccountNotSynced => StatusCode::NOT_FOUND,
            AuthError::MissingCapability(_) => StatusCode::FORBIDDEN,
            AuthError::VerificationUnavailable | AuthError::JwksFetchError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::VerificationUnavailable => {
                write!(f, "Token verification is not configured on this server")
            }
            AuthError::JwksFetchError(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            AuthError::NoMatchingKey => write!(f, "No matching key found in JWKS"),
            AuthError::AccountNotSynced => write!(
                f,
                "No account exists for this identity; call POST /v1/accounts/sync first"
            ),
            AuthError::MissingCapability(capability) => {
                write!(f, "This operation requires the {capability} capability")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error_code = self.error_code(), error = %self, "Authentication failure");
        }
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401_with_code() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn missing_capability_names_it() {
        let response = AuthError::MissingCapability(Capability::AdminManage).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("admin-manage"));
    }

    #[test]
    fn unsynced_account_is_not_found() {
        assert_eq!(AuthError::AccountNotSynced.status_code(), StatusCode::NOT_FOUND);
    }
}
