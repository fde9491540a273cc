// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Razorpay Orders API client.
//!
//! `POST {base}/v1/orders` with HTTP basic auth `key_id:key_secret`.
//! See https://razorpay.com/docs/api/orders/create/

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CreateOrderRequest, GatewayError, GatewayOrder, PaymentGateway};
use crate::config::GatewayConfig;

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
    #[serde(skip_serializing_if = "no_notes")]
    notes: &'a BTreeMap<String, String>,
}

fn no_notes(notes: &&BTreeMap<String, String>) -> bool {
    notes.is_empty()
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: u64,
    currency: String,
    #[serde(default)]
    status: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    api_base_url: String,
    key_id: String,
    key_secret: String,
    http: Client,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("api_base_url", &self.api_base_url)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        if config.key_id.is_empty() {
            return Err(GatewayError::MissingConfig("RAZORPAY_KEY_ID".to_string()));
        }
        if config.key_secret.is_empty() {
            return Err(GatewayError::MissingConfig("RAZORPAY_KEY_SECRET".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            http,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let body = OrderBody {
            amount: request.amount_minor,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let response = self
            .http
            .post(format!("{}/v1/orders", self.api_base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("POST /v1/orders failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status, body });
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("POST /v1/orders invalid JSON: {e}")))?;

        if order.id.trim().is_empty() {
            return Err(GatewayError::InvalidResponse("missing order id in response".to_string()));
        }
        if order.amount != request.amount_minor {
            return Err(GatewayError::InvalidResponse(format!(
                "order amount {} does not match requested {}",
                order.amount, request.amount_minor
            )));
        }

        tracing::info!(
            order_id = %order.id,
            amount_minor = order.amount,
            currency = %order.currency,
            receipt = %request.receipt,
            "Gateway order created"
        );

        Ok(GatewayOrder {
            id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
            status: order.status,
        })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig {
            key_id: "rzp_test_abc".into(),
            key_secret: "secret".into(),
            api_base_url: "https://api.razorpay.com/".into(),
            currency: "INR".into(),
        }
    }

    #[test]
    fn from_config_normalizes_base_url() {
        let client = RazorpayClient::from_config(&config()).unwrap();
        assert_eq!(client.api_base_url, "https://api.razorpay.com");
        assert_eq!(client.key_id(), "rzp_test_abc");
    }

    #[test]
    fn from_config_requires_credentials() {
        let mut cfg = config();
        cfg.key_secret.clear();
        assert!(matches!(
            RazorpayClient::from_config(&cfg),
            Err(GatewayError::MissingConfig(_))
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let client = RazorpayClient::from_config(&config()).unwrap();
        assert!(!format!("{client:?}").contains("key_secret"));
    }

    #[test]
    fn order_body_shape() {
        let notes = [("account_id".to_string(), "acct_1".to_string())].into();
        let body = OrderBody {
            amount: 10_700,
            currency: "INR",
            receipt: "receipt_1",
            notes: &notes,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"], 10_700);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["notes"]["account_id"], "acct_1");

        let empty = BTreeMap::new();
        let json = serde_json::to_value(OrderBody { notes: &empty, ..body }).unwrap();
        assert!(json.get("notes").is_none());
    }
}
