// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Account changes, catalog authoring, checkout and every payment rejection
//! are recorded in the `audit_events` table. Keys start with the UTC date, so
//! a day's events are one contiguous range in insertion order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{put_json, Database, AUDIT_EVENTS};
use super::StoreResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Account events
    AccountCreated,
    AccountDeleted,
    RoleChanged,

    // Catalog events
    CourseCreated,
    CourseUpdated,
    CourseDeleted,

    // Purchase events
    OrderCreated,
    PaymentRejected,
    EnrollmentCompleted,
    EnrollmentReconciliationRequired,

    // Auth events
    PermissionDenied,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Local account id of the actor, if known
    pub actor_id: Option<String>,
    /// Resource type (course, account, order)
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor_id: None,
            resource_type: None,
            resource_id: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    fn storage_key(&self) -> String {
        format!(
            "{}|{:020}|{}",
            self.timestamp.format("%Y-%m-%d"),
            self.timestamp.timestamp_micros(),
            self.event_id
        )
    }
}

/// Filter for reading one day of audit events.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub date: NaiveDate,
    pub event_type: Option<AuditEventType>,
    pub actor_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl AuditQuery {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            event_type: None,
            actor_id: None,
            limit: 100,
            offset: 0,
        }
    }
}

pub struct AuditRepository<'a> {
    db: &'a Database,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn log(&self, event: &AuditEvent) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            put_json(&mut table, &event.storage_key(), event)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Events of one UTC day matching the query, oldest first.
    pub fn query(&self, query: &AuditQuery) -> StoreResult<Vec<AuditEvent>> {
        let date = query.date.format("%Y-%m-%d").to_string();
        // '~' sorts after every digit, so this bounds the day's keys
        let start = format!("{date}|");
        let end = format!("{date}|~");

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::new();
        let mut skipped = 0;
        for entry in table.range(start.as_str()..end.as_str())? {
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;

            if query.event_type.is_some_and(|t| t != event.event_type) {
                continue;
            }
            if query
                .actor_id
                .as_deref()
                .is_some_and(|actor| event.actor_id.as_deref() != Some(actor))
            {
                continue;
            }
            if skipped < query.offset {
                skipped += 1;
                continue;
            }
            events.push(event);
            if events.len() >= query.limit {
                break;
            }
        }
        Ok(events)
    }
}

/// Record an audit event; a failed write is logged and otherwise ignored.
pub fn record(db: &Database, event: AuditEvent) {
    if let Err(e) = AuditRepository::new(db).log(&event) {
        tracing::warn!(
            error = %e,
            event_type = ?event.event_type,
            "Failed to write audit event"
        );
    }
}

/// Helper macro for logging audit events.
#[macro_export]
macro_rules! audit_log {
    ($db:expr, $event_type:expr, $actor_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type).with_actor($actor_id);
        $crate::storage::audit::record($db, event);
    }};
    ($db:expr, $event_type:expr, $actor_id:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_actor($actor_id)
            .with_resource($resource_type, $resource_id);
        $crate::storage::audit::record($db, event);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn builder_sets_fields() {
        let event = AuditEvent::new(AuditEventType::CourseCreated)
            .with_actor("acct_1")
            .with_resource("course", "course_1")
            .with_details(serde_json::json!({ "price": 100 }));

        assert_eq!(event.actor_id.as_deref(), Some("acct_1"));
        assert_eq!(event.resource_type.as_deref(), Some("course"));
        assert_eq!(event.resource_id.as_deref(), Some("course_1"));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::PaymentRejected).failed("signature mismatch");
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("signature mismatch"));
    }

    #[test]
    fn log_and_query_in_order() {
        let (db, _dir) = temp_db();
        let repo = AuditRepository::new(&db);
        repo.log(&AuditEvent::new(AuditEventType::OrderCreated).with_actor("a1")).unwrap();
        repo.log(&AuditEvent::new(AuditEventType::EnrollmentCompleted).with_actor("a1")).unwrap();

        let events = repo.query(&AuditQuery::for_date(today())).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::OrderCreated);
        assert_eq!(events[1].event_type, AuditEventType::EnrollmentCompleted);
    }

    #[test]
    fn query_filters_and_paginates() {
        let (db, _dir) = temp_db();
        let repo = AuditRepository::new(&db);
        for i in 0..5 {
            repo.log(
                &AuditEvent::new(AuditEventType::PaymentRejected)
                    .with_actor(format!("a{}", i % 2))
                    .with_resource("order", format!("order_{i}")),
            )
            .unwrap();
        }
        repo.log(&AuditEvent::new(AuditEventType::CourseCreated).with_actor("a0")).unwrap();

        let mut query = AuditQuery::for_date(today());
        query.event_type = Some(AuditEventType::PaymentRejected);
        assert_eq!(repo.query(&query).unwrap().len(), 5);

        query.actor_id = Some("a0".into());
        assert_eq!(repo.query(&query).unwrap().len(), 3);

        query.actor_id = None;
        query.offset = 1;
        query.limit = 2;
        let page = repo.query(&query).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].resource_id.as_deref(), Some("order_1"));
    }

    #[test]
    fn other_days_are_excluded() {
        let (db, _dir) = temp_db();
        let repo = AuditRepository::new(&db);
        let mut old = AuditEvent::new(AuditEventType::CourseDeleted);
        old.timestamp = old.timestamp - chrono::Duration::days(3);
        repo.log(&old).unwrap();

        assert!(repo.query(&AuditQuery::for_date(today())).unwrap().is_empty());
        let that_day = AuditQuery::for_date(old.timestamp.date_naive());
        assert_eq!(repo.query(&that_day).unwrap().len(), 1);
    }

    #[test]
    fn macro_records_event() {
        let (db, _dir) = temp_db();
        crate::audit_log!(&db, AuditEventType::RoleChanged, "admin_1", "account", "acct_9");

        let events = AuditRepository::new(&db).query(&AuditQuery::for_date(today())).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resource_id.as_deref(), Some("acct_9"));
    }
}
