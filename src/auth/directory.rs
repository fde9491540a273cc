// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clerk Backend API profile lookup.
//!
//! Session tokens often carry only `sub`. When a new account is synced and
//! the token has no email, the profile is fetched from
//! `GET {CLERK_API_URL}/v1/users/{user_id}` with the backend secret key.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::ClerkConfig;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Clerk user {0} not found")]
    UserNotFound(String),

    #[error("Clerk request failed: {0}")]
    Request(String),

    #[error("Clerk response was invalid: {0}")]
    InvalidResponse(String),
}

/// Profile fields needed to create a local account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryProfile {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct ClerkEmailAddress {
    id: String,
    email_address: String,
}

impl ClerkUser {
    fn into_profile(self) -> DirectoryProfile {
        let email = self
            .primary_email_address_id
            .as_deref()
            .and_then(|primary| self.email_addresses.iter().find(|e| e.id == primary))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone());

        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        DirectoryProfile {
            email,
            name: (!name.is_empty()).then_some(name),
        }
    }
}

#[derive(Clone)]
pub struct ClerkDirectory {
    api_url: String,
    secret_key: String,
    http: Client,
}

impl std::fmt::Debug for ClerkDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkDirectory")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl ClerkDirectory {
    /// `None` when no backend secret key is configured.
    pub fn from_config(config: &ClerkConfig) -> Result<Option<Self>, DirectoryError> {
        let Some(secret_key) = config.secret_key.clone() else {
            return Ok(None);
        };
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DirectoryError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key,
            http,
        }))
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<DirectoryProfile, DirectoryError> {
        let url = format!("{}/v1/users/{}", self.api_url, user_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| DirectoryError::Request(format!("GET /v1/users failed: {e}")))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(DirectoryError::UserNotFound(user_id.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(DirectoryError::Request(format!(
                    "GET /v1/users returned {status}: {body}"
                )));
            }
        }

        let user: ClerkUser = response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;
        Ok(user.into_profile())
    }
}
