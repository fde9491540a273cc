// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! - [`Auth`]: a verified Clerk identity, nothing more. Used by account sync.
//! - [`CurrentAccount`]: the identity plus its local account record.
//! - [`CourseAuthor`] / [`PlatformAdmin`]: a `CurrentAccount` whose role
//!   grants `write-own-course` / `admin-manage`.
//!
//! ```rust,ignore
//! async fn handler(CurrentAccount { account, .. }: CurrentAccount) -> impl IntoResponse {
//!     // account.role decides what this caller may do
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Validation};

use super::claims::{AuthenticatedUser, ClerkClaims};
use super::error::AuthError;
use super::roles::Capability;
use crate::state::{AppState, AuthConfig};
use crate::storage::{AccountRepository, StoredAccount};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // An upstream layer (or a test) may already have verified the caller
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_token(token, &state.auth_config).await?;
        Ok(Auth(user))
    }
}

async fn verify_token(token: &str, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match &config.jwks {
        Some(jwks) => {
            let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
            let (key, algorithm) = jwks.decoding_key(header.kid.as_deref()).await?;

            let mut validation = Validation::new(algorithm);
            validation.leeway = CLOCK_SKEW_LEEWAY;
            if let Some(issuer) = &config.issuer {
                validation.set_issuer(&[issuer]);
            }
            match &config.audience {
                Some(audience) => validation.set_audience(&[audience]),
                None => validation.validate_aud = false,
            }

            let data = decode::<ClerkClaims>(token, &key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            })?;
            Ok(AuthenticatedUser::from_claims(data.claims))
        }
        None => verify_token_insecure(token),
    }
}

/// Decode without signature verification. Only compiled into dev builds.
#[cfg(any(test, feature = "dev"))]
fn verify_token_insecure(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<ClerkClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims = data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    tracing::warn!(sub = %claims.sub, "Accepted unverified JWT (dev build without JWKS)");
    Ok(AuthenticatedUser::from_claims(claims))
}

#[cfg(not(any(test, feature = "dev")))]
fn verify_token_insecure(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    Err(AuthError::VerificationUnavailable)
}

/// Verified identity resolved to its local account.
pub struct CurrentAccount {
    pub identity: AuthenticatedUser,
    pub account: StoredAccount,
}

impl CurrentAccount {
    pub fn require(&self, capability: Capability) -> Result<(), AuthError> {
        if self.account.role.can(capability) {
            Ok(())
        } else {
            tracing::info!(
                account_id = %self.account.id,
                role = %self.account.role,
                %capability,
                "Capability check failed"
            );
            Err(AuthError::MissingCapability(capability))
        }
    }
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;

        let account = AccountRepository::new(&state.db)
            .find_by_external_id(&identity.user_id)
            .map_err(|e| AuthError::InternalError(format!("account lookup failed: {e}")))?
            .ok_or(AuthError::AccountNotSynced)?;

        Ok(CurrentAccount { identity, account })
    }
}

/// Caller allowed to author courses.
pub struct CourseAuthor(pub CurrentAccount);

impl FromRequestParts<AppState> for CourseAuthor {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentAccount::from_request_parts(parts, state).await?;
        current.require(Capability::WriteOwnCourse)?;
        Ok(CourseAuthor(current))
    }
}

/// Caller allowed to manage the platform.
pub struct PlatformAdmin(pub CurrentAccount);

impl FromRequestParts<AppState> for PlatformAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentAccount::from_request_parts(parts, state).await?;
        current.require(Capability::AdminManage)?;
        Ok(PlatformAdmin(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::test_support::test_state;
    use axum::http::Request;

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    /// Unsigned token; accepted because tests build without JWKS.
    fn unsigned_jwt(claims: serde_json::Value) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{body}.fake_signature")
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (state, _guard) = test_state();
        let mut parts = parts_with_token(None);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn non_bearer_header_is_rejected() {
        let (state, _guard) = test_state();
        let mut parts = Request::builder()
            .header("Authorization", "Basic abc")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn dev_token_yields_identity() {
        let (state, _guard) = test_state();
        let token = unsigned_jwt(serde_json::json!({
            "sub": "user_123",
            "exp": 9999999999i64,
            "iss": "test",
            "email": "s@example.com",
        }));
        let mut parts = parts_with_token(Some(&token));
        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.email.as_deref(), Some("s@example.com"));
    }

    #[tokio::test]
    async fn expired_dev_token_is_rejected() {
        let (state, _guard) = test_state();
        let token = unsigned_jwt(serde_json::json!({ "sub": "user_123", "exp": 1_000 }));
        let mut parts = parts_with_token(Some(&token));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn unsynced_identity_has_no_current_account() {
        let (state, _guard) = test_state();
        let mut parts = parts_with_token(None);
        parts.extensions.insert(AuthenticatedUser::with_subject("user_ghost"));
        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::AccountNotSynced)));
    }

    #[tokio::test]
    async fn capability_extractors_follow_local_role() {
        let (state, _guard) = test_state();
        let repo = AccountRepository::new(&state.db);
        repo.create(&StoredAccount::new("user_s", "s@example.com", "Student", Role::Student))
            .unwrap();
        repo.create(&StoredAccount::new("user_t", "t@example.com", "Teacher", Role::Teacher))
            .unwrap();

        // Token claims admin, local record says student: local record wins
        let mut identity = AuthenticatedUser::with_subject("user_s");
        identity.provider_role = Some(Role::Admin);
        let mut parts = parts_with_token(None);
        parts.extensions.insert(identity);
        let result = PlatformAdmin::from_request_parts(&mut parts, &state).await;
        assert!(matches!(
            result,
            Err(AuthError::MissingCapability(Capability::AdminManage))
        ));

        let mut parts = parts_with_token(None);
        parts.extensions.insert(AuthenticatedUser::with_subject("user_t"));
        let CourseAuthor(author) = CourseAuthor::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(author.account.role, Role::Teacher);
    }
}
