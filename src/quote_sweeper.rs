// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Quote Sweeper
//!
//! Background task that removes checkout quotes nobody paid for. A quote
//! is eligible once its `expires_at` has passed while still in `quoted`
//! status; enrolled quotes are the purchase record and are never removed.
//!
//! ## Shutdown
//!
//! Stops at the next tick after the `CancellationToken` is cancelled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{Database, QuoteRepository};

pub struct QuoteSweeper {
    db: Arc<Database>,
    interval: Duration,
}

impl QuoteSweeper {
    pub fn new(db: Arc<Database>, interval: Duration) -> Self {
        Self { db, interval }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Quote sweeper starting");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Quote sweeper shutting down");
                    return;
                }
            }
            self.sweep();
        }
    }

    /// Purge expired quotes once; returns how many were removed.
    pub fn sweep(&self) -> usize {
        match QuoteRepository::new(&self.db).purge_expired(Utc::now()) {
            Ok(0) => {
                debug!("Quote sweeper: nothing to purge");
                0
            }
            Ok(purged) => {
                info!(purged, "Quote sweeper: purged expired quotes");
                purged
            }
            Err(e) => {
                warn!(error = %e, "Quote sweeper: purge failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;
    use crate::storage::repository::quotes::sample_quote;

    #[test]
    fn sweep_removes_only_expired_unpaid_quotes() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        let repo = QuoteRepository::new(&db);

        let mut stale = sample_quote("order_stale", "acct_1", &["c1"]);
        stale.expires_at = Utc::now() - chrono::Duration::minutes(1);
        repo.create(&stale).unwrap();
        repo.create(&sample_quote("order_fresh", "acct_1", &["c1"])).unwrap();

        let sweeper = QuoteSweeper::new(db.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep(), 1);
        assert!(repo.find("order_stale").unwrap().is_none());
        assert!(repo.find("order_fresh").unwrap().is_some());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (db, _dir) = temp_db();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(QuoteSweeper::new(Arc::new(db), Duration::from_secs(3600)).run(shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
