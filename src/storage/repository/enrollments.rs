// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Enrollment commit.
//!
//! Granting access touches three records: the buyer's account (enrolled set
//! and cart), every purchased course (student set) and the quote (status).
//! All of it happens in one redb write transaction, so either every side of
//! the relation is written or none is.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::storage::database::{get_json, put_json, Database, ACCOUNTS, COURSES, QUOTES};
use crate::storage::{QuoteStatus, StoreError, StoreResult, StoredAccount, StoredCourse, StoredQuote};

/// Quote to settle in the same transaction as the enrollment.
#[derive(Debug, Clone, Copy)]
pub struct QuoteSettlement<'s> {
    pub order_id: &'s str,
    pub payment_id: &'s str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    /// Requested courses the account is now enrolled in
    pub enrolled: BTreeSet<String>,
    /// Subset of `enrolled` that was not enrolled before this commit
    pub newly_enrolled: BTreeSet<String>,
    /// Requested courses that no longer exist
    pub missing: BTreeSet<String>,
    /// The quote had already been settled by an earlier commit
    pub quote_already_settled: bool,
}

pub struct EnrollmentRepository<'a> {
    db: &'a Database,
}

impl<'a> EnrollmentRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Enroll `account_id` in `course_ids` and drop them from its cart.
    ///
    /// Set semantics throughout: repeating a commit changes nothing and
    /// reports the same `enrolled` set with an empty `newly_enrolled`.
    pub fn commit(
        &self,
        account_id: &str,
        course_ids: &BTreeSet<String>,
        settlement: Option<QuoteSettlement<'_>>,
    ) -> StoreResult<EnrollmentOutcome> {
        let mut outcome = EnrollmentOutcome::default();

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account: StoredAccount = get_json(&accounts, account_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))?;

            let now = Utc::now();
            let mut courses = write_txn.open_table(COURSES)?;
            for course_id in course_ids {
                let Some(mut course) = get_json::<StoredCourse, _>(&courses, course_id)? else {
                    outcome.missing.insert(course_id.clone());
                    continue;
                };
                if course.students_enrolled.insert(account.id.clone()) {
                    course.updated_at = now;
                    put_json(&mut courses, &course.id, &course)?;
                }
                if account.enrolled_courses.insert(course_id.clone()) {
                    outcome.newly_enrolled.insert(course_id.clone());
                }
                outcome.enrolled.insert(course_id.clone());
            }

            let cart_before = account.cart.len();
            account.cart.retain(|id| !course_ids.contains(id));
            if !outcome.newly_enrolled.is_empty() || account.cart.len() != cart_before {
                account.updated_at = now;
                put_json(&mut accounts, &account.id, &account)?;
            }

            if let Some(settlement) = settlement {
                let mut quotes = write_txn.open_table(QUOTES)?;
                let mut quote: StoredQuote = get_json(&quotes, settlement.order_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("Order {}", settlement.order_id)))?;
                if quote.account_id != account.id {
                    return Err(StoreError::Conflict(format!(
                        "order {} belongs to another account",
                        settlement.order_id
                    )));
                }
                match quote.status {
                    QuoteStatus::Quoted => {
                        quote.status = QuoteStatus::Enrolled;
                        quote.payment_id = Some(settlement.payment_id.to_string());
                        quote.enrolled_at = Some(now);
                        put_json(&mut quotes, &quote.order_id, &quote)?;
                    }
                    QuoteStatus::Enrolled => outcome.quote_already_settled = true,
                }
            }
        }
        write_txn.commit()?;

        Ok(outcome)
    }
}
