// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clerk JWKS fetching with a TTL cache.
//!
//! Keys are refetched when the cache expires or when a token names a `kid`
//! the cached set does not contain (Clerk rotated its keys). If a refetch
//! fails while a stale set is cached, the stale set keeps serving.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CachedKeys>>>,
    http: reqwest::Client,
}

impl JwksManager {
    /// Manager for e.g. `https://<instance>.clerk.accounts.dev/.well-known/jwks.json`.
    pub fn new(jwks_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            http,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Decoding key for a token header's `kid`, or the first usable key when
    /// the token carries none.
    pub async fn decoding_key(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), AuthError> {
        let keys = self.current_keys(false).await?;
        if let Some(found) = select_key(&keys, kid) {
            return found;
        }

        // Unknown kid: the signing key may have rotated since the last fetch
        tracing::debug!(kid = ?kid, "Key not in cached JWKS, refetching");
        let keys = self.current_keys(true).await?;
        select_key(&keys, kid).unwrap_or(Err(AuthError::NoMatchingKey))
    }

    /// Fetch the key set now, replacing the cache. Used at startup.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.current_keys(true).await.map(|_| ())
    }

    pub async fn is_cached(&self) -> bool {
        self.cache
            .read()
            .await
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
    }

    async fn current_keys(&self, force: bool) -> Result<JwkSet, AuthError> {
        if !force {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.keys.clone());
                }
            }
        }

        match self.fetch().await {
            Ok(keys) => {
                *self.cache.write().await = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(err) => {
                let cache = self.cache.read().await;
                match cache.as_ref() {
                    Some(stale) => {
                        tracing::warn!(error = %err, "JWKS refresh failed, serving stale keys");
                        Ok(stale.keys.clone())
                    }
                    None => Err(err),
                }
            }
        }
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))
    }
}

/// `None` when no candidate key exists in the set.
fn select_key(
    keys: &JwkSet,
    kid: Option<&str>,
) -> Option<Result<(DecodingKey, Algorithm), AuthError>> {
    match kid {
        Some(kid) => keys
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .map(to_decoding_key),
        None => keys.keys.iter().map(to_decoding_key).find(Result::is_ok),
    }
}

fn to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InternalError(format!("Invalid RSA key in JWKS: {e}")))?;
            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };
            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InternalError(format!("Invalid EC key in JWKS: {e}")))?;
            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };
            Ok((key, alg))
        }
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
