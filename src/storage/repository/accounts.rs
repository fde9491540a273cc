// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account repository.
//!
//! Accounts are keyed by a local UUID. Two index tables map the identity
//! provider subject and the lowercase email to that id; both are checked and
//! written in the same transaction as the account, which is what makes them
//! unique.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::database::{
    all_json, get_json, put_json, Database, ACCOUNTS, ACCOUNT_EMAILS, ACCOUNT_EXTERNAL_IDS, COURSES,
};
use crate::storage::{StoreError, StoreResult, StoredCourse};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredAccount {
    pub id: String,
    /// Identity provider subject; immutable
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub enrolled_courses: BTreeSet<String>,
    #[serde(default)]
    pub cart: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredAccount {
    pub fn new(
        external_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: external_id.into(),
            email: email.into().trim().to_string(),
            name: name.into(),
            role,
            enrolled_courses: BTreeSet::new(),
            cart: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_enrolled(&self, course_id: &str) -> bool {
        self.enrolled_courses.contains(course_id)
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AccountRepository<'a> {
    db: &'a Database,
}

impl<'a> AccountRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find(&self, account_id: &str) -> StoreResult<Option<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        get_json(&table, account_id)
    }

    pub fn get(&self, account_id: &str) -> StoreResult<StoredAccount> {
        self.find(account_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))
    }

    pub fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_EXTERNAL_IDS)?;
        let account_id = match index.get(external_id)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(ACCOUNTS)?;
        get_json(&table, &account_id)
    }

    /// Case-insensitive email lookup.
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_EMAILS)?;
        let account_id = match index.get(email_key(email).as_str())? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(ACCOUNTS)?;
        get_json(&table, &account_id)
    }

    /// Insert a new account. Fails with `AlreadyExists` if the id, the
    /// external id or the email is taken.
    pub fn create(&self, account: &StoredAccount) -> StoreResult<()> {
        if account.external_id.trim().is_empty() {
            return Err(StoreError::Invalid("external id must not be empty".into()));
        }
        let email = email_key(&account.email);
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Invalid(format!("invalid email address '{}'", account.email)));
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut by_external_id = write_txn.open_table(ACCOUNT_EXTERNAL_IDS)?;
            let mut by_email = write_txn.open_table(ACCOUNT_EMAILS)?;

            if accounts.get(account.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Account {}", account.id)));
            }
            if by_external_id.get(account.external_id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "Account for identity {}",
                    account.external_id
                )));
            }
            if by_email.get(email.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "Account with email {}",
                    account.email
                )));
            }

            put_json(&mut accounts, &account.id, account)?;
            by_external_id.insert(account.external_id.as_str(), account.id.as_str())?;
            by_email.insert(email.as_str(), account.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn list_all(&self) -> StoreResult<Vec<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        let mut accounts: Vec<StoredAccount> = all_json(&table)?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    pub fn set_role(&self, account_id: &str, role: Role) -> StoreResult<StoredAccount> {
        self.modify(account_id, |account| {
            account.role = role;
            Ok(())
        })
    }

    /// Add a course to the cart. The course must exist and must not already
    /// be owned.
    pub fn add_to_cart(&self, account_id: &str, course_id: &str) -> StoreResult<StoredAccount> {
        let write_txn = self.db.begin_write()?;
        let account = {
            let courses = write_txn.open_table(COURSES)?;
            if get_json::<StoredCourse, _>(&courses, course_id)?.is_none() {
                return Err(StoreError::NotFound(format!("Course {course_id}")));
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account: StoredAccount = get_json(&accounts, account_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))?;
            if account.is_enrolled(course_id) {
                return Err(StoreError::Conflict(format!(
                    "already enrolled in course {course_id}"
                )));
            }
            if account.cart.insert(course_id.to_string()) {
                account.updated_at = Utc::now();
                put_json(&mut accounts, &account.id, &account)?;
            }
            account
        };
        write_txn.commit()?;
        Ok(account)
    }

    /// Remove a course from the cart; removing an absent entry is a no-op.
    pub fn remove_from_cart(&self, account_id: &str, course_id: &str) -> StoreResult<StoredAccount> {
        self.modify(account_id, |account| {
            account.cart.remove(course_id);
            Ok(())
        })
    }

    /// Delete an account, its index entries, and its membership in every
    /// course's enrolled set.
    ///
    /// Returns the number of courses that listed the account as a student.
    pub fn delete(&self, account_id: &str) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let touched = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let account: StoredAccount = get_json(&accounts, account_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))?;
            accounts.remove(account_id)?;

            let mut by_external_id = write_txn.open_table(ACCOUNT_EXTERNAL_IDS)?;
            by_external_id.remove(account.external_id.as_str())?;
            let mut by_email = write_txn.open_table(ACCOUNT_EMAILS)?;
            by_email.remove(email_key(&account.email).as_str())?;

            // Scan rather than trust the account's own set, so stray
            // memberships are cleaned up too
            let mut courses = write_txn.open_table(COURSES)?;
            let enrolled_in: Vec<StoredCourse> = all_json::<StoredCourse, _>(&courses)?
                .into_iter()
                .filter(|c| c.students_enrolled.contains(account_id))
                .collect();
            let now = Utc::now();
            for mut course in enrolled_in.iter().cloned() {
                course.students_enrolled.remove(account_id);
                course.updated_at = now;
                put_json(&mut courses, &course.id, &course)?;
            }
            enrolled_in.len()
        };
        write_txn.commit()?;

        tracing::info!(account_id, courses_updated = touched, "Account deleted");
        Ok(touched)
    }

    /// Read-modify-write of one account inside a single write transaction.
    fn modify<F>(&self, account_id: &str, change: F) -> StoreResult<StoredAccount>
    where
        F: FnOnce(&mut StoredAccount) -> StoreResult<()>,
    {
        let write_txn = self.db.begin_write()?;
        let account = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut account: StoredAccount = get_json(&accounts, account_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))?;
            change(&mut account)?;
            account.updated_at = Utc::now();
            put_json(&mut accounts, &account.id, &account)?;
            account
        };
        write_txn.commit()?;
        Ok(account)
    }
}
