// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clerk JWT claims and the verified identity derived from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by a Clerk session token.
///
/// Clerk's default session token only carries the standard claims; `email`,
/// `name` and `publicMetadata` appear when the instance's JWT template adds
/// them. See: https://clerk.com/docs/backend-requests/making/custom-session-token
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkClaims {
    /// Subject: the Clerk user id
    pub sub: String,

    #[serde(default)]
    pub exp: i64,

    #[serde(default)]
    pub iss: String,

    /// Clerk session id
    #[serde(default)]
    pub sid: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "publicMetadata")]
    pub public_metadata: Option<PublicMetadata>,
}

/// Clerk public metadata (writable only from the Clerk dashboard or backend).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// Identity verified from a bearer token.
///
/// This is who the caller *is*. What they may do is decided by the local
/// account record (see `CurrentAccount`), not by anything in here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Clerk user id (`sub`), stored as the account's `external_id`
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Role asserted by the identity provider's public metadata, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_role: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip)]
    pub issuer: String,

    /// Token expiry (Unix seconds)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: ClerkClaims) -> Self {
        let provider_role = claims
            .public_metadata
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .and_then(Role::parse);

        Self {
            user_id: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            name: claims.name.filter(|n| !n.trim().is_empty()),
            provider_role,
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// Minimal identity with only a subject, for tests and internal callers.
    pub fn with_subject(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            name: None,
            provider_role: None,
            session_id: None,
            issuer: String::new(),
            expires_at: 0,
        }
    }

    /// True when the identity provider itself marks this user as admin.
    pub fn provider_is_admin(&self) -> bool {
        self.provider_role == Some(Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> ClerkClaims {
        serde_json::from_value(serde_json::json!({
            "sub": "user_2abc",
            "exp": 1700003600,
            "iss": "https://clerk.example.com",
            "sid": "sess_1",
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "publicMetadata": { "role": "educator" }
        }))
        .unwrap()
    }

    #[test]
    fn from_claims_copies_profile_fields() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_2abc");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(user.session_id.as_deref(), Some("sess_1"));
        assert_eq!(user.provider_role, Some(Role::Teacher));
        assert!(!user.provider_is_admin());
    }

    #[test]
    fn minimal_token_has_no_profile() {
        let claims: ClerkClaims = serde_json::from_str(r#"{"sub":"user_x"}"#).unwrap();
        let user = AuthenticatedUser::from_claims(claims);
        assert!(user.email.is_none());
        assert!(user.provider_role.is_none());
    }

    #[test]
    fn blank_email_is_treated_as_absent() {
        let mut claims = sample_claims();
        claims.email = Some("  ".into());
        assert!(AuthenticatedUser::from_claims(claims).email.is_none());
    }

    #[test]
    fn unknown_metadata_role_is_ignored() {
        let mut claims = sample_claims();
        claims.public_metadata = Some(PublicMetadata {
            role: Some("superuser".into()),
        });
        assert!(AuthenticatedUser::from_claims(claims).provider_role.is_none());
    }
}
