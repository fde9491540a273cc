// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment signature verification.
//!
//! The gateway signs a completed payment as
//! `hex(HMAC_SHA256(key_secret, order_id + "|" + payment_id))`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct PaymentSignatureVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for PaymentSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl PaymentSignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
        };
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac
    }

    /// Lowercase hex signature the gateway would produce.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.mac(order_id, payment_id).finalize().into_bytes())
    }

    /// Constant-time check of a signature in the gateway's exact form:
    /// 64 lowercase hex characters, no surrounding whitespace.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if !is_canonical_hex(signature) {
            return false;
        }
        let Ok(supplied) = hex::decode(signature) else {
            return false;
        };
        self.mac(order_id, payment_id).verify_slice(&supplied).is_ok()
    }
}

/// Length of a hex-encoded HMAC-SHA256 digest.
const SIGNATURE_HEX_LEN: usize = 64;

fn is_canonical_hex(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN
        && signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
