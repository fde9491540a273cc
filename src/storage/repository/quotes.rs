// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Checkout quotes keyed by gateway order id.
//!
//! A quote records what the server priced and for whom, so that a payment
//! report can be checked against it. Quotes move from `quoted` to `enrolled`
//! inside the enrollment commit; unpaid quotes are purged after they expire.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{all_json, get_json, put_json, Database, QUOTES};
use crate::storage::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Gateway order opened, payment not yet verified
    Quoted,
    /// Payment verified and enrollment committed
    Enrolled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredQuote {
    pub order_id: String,
    pub account_id: String,
    pub course_ids: BTreeSet<String>,
    pub subtotal: u64,
    pub platform_fee: u64,
    pub total: u64,
    /// `total` in the currency's minor unit, as sent to the gateway
    pub amount_minor: u64,
    pub currency: String,
    pub receipt: String,
    pub status: QuoteStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl StoredQuote {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == QuoteStatus::Quoted && self.expires_at <= now
    }
}

pub struct QuoteRepository<'a> {
    db: &'a Database,
}

impl<'a> QuoteRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find(&self, order_id: &str) -> StoreResult<Option<StoredQuote>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(QUOTES)?;
        get_json(&table, order_id)
    }

    pub fn get(&self, order_id: &str) -> StoreResult<StoredQuote> {
        self.find(order_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Order {order_id}")))
    }

    pub fn create(&self, quote: &StoredQuote) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(QUOTES)?;
            if table.get(quote.order_id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Order {}", quote.order_id)));
            }
            put_json(&mut table, &quote.order_id, quote)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn list_by_account(&self, account_id: &str) -> StoreResult<Vec<StoredQuote>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(QUOTES)?;
        let mut quotes: Vec<StoredQuote> = all_json::<StoredQuote, _>(&table)?
            .into_iter()
            .filter(|q| q.account_id == account_id)
            .collect();
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotes)
    }

    /// Remove unpaid quotes whose expiry has passed. Enrolled quotes are kept
    /// as the purchase record.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(QUOTES)?;
            let expired: Vec<String> = all_json::<StoredQuote, _>(&table)?
                .into_iter()
                .filter(|q| q.is_expired(now))
                .map(|q| q.order_id)
                .collect();
            for order_id in &expired {
                table.remove(order_id.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}

#[cfg(test)]
pub(crate) fn sample_quote(order_id: &str, account_id: &str, course_ids: &[&str]) -> StoredQuote {
    let now = Utc::now();
    StoredQuote {
        order_id: order_id.to_string(),
        account_id: account_id.to_string(),
        course_ids: course_ids.iter().map(|c| c.to_string()).collect(),
        subtotal: 100,
        platform_fee: 7,
        total: 107,
        amount_minor: 10_700,
        currency: "INR".to_string(),
        receipt: format!("receipt_{order_id}"),
        status: QuoteStatus::Quoted,
        payment_id: None,
        created_at: now,
        expires_at: now + chrono::Duration::hours(24),
        enrolled_at: None,
    }
}
