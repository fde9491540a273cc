// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed repositories over the marketplace database.
//!
//! Each repository borrows the shared [`Database`](super::Database) and owns
//! the transactions for one entity; the enrollment repository is the one
//! place that writes across entities.

pub mod accounts;
pub mod courses;
pub mod enrollments;
pub mod quotes;

pub use accounts::{AccountRepository, StoredAccount};
pub use courses::{CourseRepository, Lecture, Note, StoredCourse};
pub use enrollments::{EnrollmentOutcome, EnrollmentRepository, QuoteSettlement};
pub use quotes::{QuoteRepository, QuoteStatus, StoredQuote};
