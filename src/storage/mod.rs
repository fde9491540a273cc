// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb file under `DATA_DIR`:
//!
//! ```text
//! $DATA_DIR/
//!   marketplace.redb
//!     courses               course_id → StoredCourse
//!     accounts              account_id → StoredAccount
//!     account_external_ids  identity subject → account_id
//!     account_emails        lowercase email → account_id
//!     quotes                order_id → StoredQuote
//!     audit_events          date|micros|event_id → AuditEvent
//! ```
//!
//! Write transactions are serialized by redb. Every operation that must keep
//! two records in agreement does so inside one write transaction; there is
//! no in-process lock around business state.

pub mod audit;
pub mod database;
pub mod ownership;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditQuery, AuditRepository};
pub use database::{Database, StoreError, StoreResult};
pub use ownership::{can_view_content, OwnedResource, OwnershipEnforcer};
pub use repository::{
    AccountRepository, CourseRepository, EnrollmentOutcome, EnrollmentRepository, Lecture, Note,
    QuoteRepository, QuoteSettlement, QuoteStatus, StoredAccount, StoredCourse, StoredQuote,
};
