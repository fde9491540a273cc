// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{ClerkDirectory, JwksManager};
use crate::checkout::CheckoutService;
use crate::storage::Database;

/// Token verification settings.
///
/// Without a JWKS manager only dev builds accept tokens (unverified).
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<Arc<JwksManager>>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn new(jwks: Arc<JwksManager>) -> Self {
        Self {
            jwks: Some(jwks),
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub checkout: Arc<CheckoutService>,
    pub auth_config: AuthConfig,
    /// Backend profile lookup, used when a token lacks an email
    pub directory: Option<Arc<ClerkDirectory>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<Database>, checkout: Arc<CheckoutService>) -> Self {
        Self {
            db,
            checkout,
            auth_config: AuthConfig::default(),
            directory: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_directory(mut self, directory: Option<ClerkDirectory>) -> Self {
        self.directory = directory.map(Arc::new);
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
