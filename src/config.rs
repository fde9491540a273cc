// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`AppConfig`]; nothing else in the crate calls `std::env`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` / `PORT` | Server bind address | `0.0.0.0` / `8080` |
//! | `DATA_DIR` | Directory holding `marketplace.redb` | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `CLERK_JWKS_URL` | Clerk JWKS endpoint for JWT verification | Required for production |
//! | `CLERK_ISSUER` | Expected JWT issuer claim | Optional |
//! | `CLERK_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `CLERK_SECRET_KEY` | Clerk backend key for profile lookup | Optional |
//! | `CLERK_API_URL` | Clerk backend API base | `https://api.clerk.com` |
//! | `RAZORPAY_KEY_ID` | Public gateway key id | Required |
//! | `RAZORPAY_KEY_SECRET` | Gateway secret, also the HMAC signing key | Required |
//! | `RAZORPAY_API_BASE_URL` | Gateway API base | `https://api.razorpay.com` |
//! | `PAYMENT_CURRENCY` | Order currency | `INR` |
//! | `QUOTE_TTL_SECS` | Lifetime of an unpaid quote | `86400` |
//! | `QUOTE_SWEEP_INTERVAL_SECS` | Period of the expired quote purge | `600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `CORS_ALLOWED_ORIGIN` | Allowed browser origin | any |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com";
pub const DEFAULT_RAZORPAY_API_BASE_URL: &str = "https://api.razorpay.com";
pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_QUOTE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_QUOTE_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env_optional("LOG_FORMAT").as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClerkConfig {
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Backend API key; enables profile lookup during account sync
    pub secret_key: Option<String>,
    pub api_url: String,
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub key_id: String,
    /// Used both for gateway basic auth and to verify payment signatures
    pub key_secret: String,
    pub api_base_url: String,
    pub currency: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("currency", &self.currency)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub clerk: ClerkConfig,
    pub gateway: GatewayConfig,
    pub quote_ttl: Duration,
    pub quote_sweep_interval: Duration,
    pub tls: Option<TlsConfig>,
    pub cors_allowed_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", DEFAULT_HOST);
        let port = env_parse("PORT", DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: "HOST",
                    reason: e.to_string(),
                })?;

        let clerk = ClerkConfig {
            jwks_url: env_optional("CLERK_JWKS_URL"),
            issuer: env_optional("CLERK_ISSUER"),
            audience: env_optional("CLERK_AUDIENCE"),
            secret_key: env_optional("CLERK_SECRET_KEY"),
            api_url: env_or_default("CLERK_API_URL", DEFAULT_CLERK_API_URL),
        };
        if let Some(url) = &clerk.jwks_url {
            require_https("CLERK_JWKS_URL", url)?;
        }

        let gateway = GatewayConfig {
            key_id: env_required("RAZORPAY_KEY_ID")?,
            key_secret: env_required("RAZORPAY_KEY_SECRET")?,
            api_base_url: env_or_default("RAZORPAY_API_BASE_URL", DEFAULT_RAZORPAY_API_BASE_URL),
            currency: env_or_default("PAYMENT_CURRENCY", DEFAULT_CURRENCY).to_ascii_uppercase(),
        };

        let quote_ttl = Duration::from_secs(env_parse(
            "QUOTE_TTL_SECS",
            DEFAULT_QUOTE_TTL.as_secs(),
        )?);
        let quote_sweep_interval = Duration::from_secs(env_parse(
            "QUOTE_SWEEP_INTERVAL_SECS",
            DEFAULT_QUOTE_SWEEP_INTERVAL.as_secs(),
        )?);
        if quote_sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "QUOTE_SWEEP_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let tls = match (env_optional("TLS_CERT_PATH"), env_optional("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("TLS_KEY_PATH")),
            (None, Some(_)) => return Err(ConfigError::Missing("TLS_CERT_PATH")),
        };

        Ok(Self {
            bind_addr,
            data_dir: env_or_default("DATA_DIR", DEFAULT_DATA_DIR).into(),
            clerk,
            gateway,
            quote_ttl,
            quote_sweep_interval,
            tls,
            cors_allowed_origin: env_optional("CORS_ALLOWED_ORIGIN"),
        })
    }
}

fn require_https(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "https" {
        return Err(ConfigError::Invalid {
            name,
            reason: "must use https".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::Missing(name))
}

pub(crate) fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
