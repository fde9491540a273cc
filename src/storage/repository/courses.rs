// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Course catalog repository.
//!
//! Courses are keyed by UUID in the `courses` table. The enrolled-student set
//! is owned by the enrollment commit: `update` never overwrites it, and
//! `delete` also strips the course from every account in the same write
//! transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{all_json, get_json, put_json, Database, ACCOUNTS, COURSES};
use crate::storage::ownership::OwnedResource;
use crate::storage::{StoreError, StoreResult, StoredAccount};

/// One video lecture. Order within the course is significant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Lecture {
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub duration: String,
    /// Visible to everyone in the public catalog
    #[serde(default)]
    pub free_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Note {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredCourse {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Whole currency units
    pub price: u64,
    pub category: String,
    /// Local account id of the owning instructor
    pub instructor_id: String,
    pub instructor_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub preview_video: Option<String>,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Account ids; written only by the enrollment commit and deletes
    #[serde(default)]
    pub students_enrolled: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCourse {
    /// New course authored by `instructor`, with a fresh id and no students.
    pub fn new(
        instructor: &StoredAccount,
        title: impl Into<String>,
        description: impl Into<String>,
        price: u64,
        category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            price,
            category: category.into(),
            instructor_id: instructor.id.clone(),
            instructor_name: instructor.name.clone(),
            image: None,
            preview_video: None,
            lectures: Vec::new(),
            notes: Vec::new(),
            students_enrolled: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Invalid("course title must not be empty".into()));
        }
        if self.category.trim().is_empty() {
            return Err(StoreError::Invalid("course category must not be empty".into()));
        }
        for (index, lecture) in self.lectures.iter().enumerate() {
            if lecture.title.trim().is_empty() || lecture.video_url.trim().is_empty() {
                return Err(StoreError::Invalid(format!(
                    "lecture {} needs a title and a video url",
                    index + 1
                )));
            }
        }
        for (index, note) in self.notes.iter().enumerate() {
            if note.title.trim().is_empty() || note.url.trim().is_empty() {
                return Err(StoreError::Invalid(format!(
                    "note {} needs a title and a url",
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

impl OwnedResource for StoredCourse {
    fn owner_id(&self) -> &str {
        &self.instructor_id
    }

    fn resource_label(&self) -> String {
        format!("course {}", self.id)
    }
}

pub struct CourseRepository<'a> {
    db: &'a Database,
}

impl<'a> CourseRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find(&self, course_id: &str) -> StoreResult<Option<StoredCourse>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COURSES)?;
        get_json(&table, course_id)
    }

    pub fn get(&self, course_id: &str) -> StoreResult<StoredCourse> {
        self.find(course_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Course {course_id}")))
    }

    /// Resolve every id from one snapshot; fails naming all ids that are missing.
    pub fn get_many(&self, course_ids: &BTreeSet<String>) -> StoreResult<Vec<StoredCourse>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COURSES)?;

        let mut courses = Vec::with_capacity(course_ids.len());
        let mut missing = Vec::new();
        for id in course_ids {
            match get_json::<StoredCourse, _>(&table, id)? {
                Some(course) => courses.push(course),
                None => missing.push(id.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(StoreError::NotFound(format!("Course {}", missing.join(", "))));
        }
        Ok(courses)
    }

    /// All courses, newest first.
    pub fn list_all(&self) -> StoreResult<Vec<StoredCourse>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COURSES)?;
        let mut courses: Vec<StoredCourse> = all_json(&table)?;
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    pub fn list_by_instructor(&self, instructor_id: &str) -> StoreResult<Vec<StoredCourse>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|c| c.instructor_id == instructor_id)
            .collect())
    }

    pub fn create(&self, course: &StoredCourse) -> StoreResult<()> {
        course.validate()?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(COURSES)?;
            if table.get(course.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Course {}", course.id)));
            }
            put_json(&mut table, &course.id, course)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Replace the authored fields of a course.
    ///
    /// The stored enrollment set and creation time are kept; whatever the
    /// caller passes for them is ignored. Returns the record as written.
    pub fn update(&self, course: &StoredCourse) -> StoreResult<StoredCourse> {
        course.validate()?;

        let write_txn = self.db.begin_write()?;
        let written = {
            let mut table = write_txn.open_table(COURSES)?;
            let current: StoredCourse = get_json(&table, &course.id)?
                .ok_or_else(|| StoreError::NotFound(format!("Course {}", course.id)))?;

            let mut next = course.clone();
            next.students_enrolled = current.students_enrolled;
            next.created_at = current.created_at;
            next.updated_at = Utc::now();
            put_json(&mut table, &next.id, &next)?;
            next
        };
        write_txn.commit()?;
        Ok(written)
    }

    /// Delete a course and remove it from every account's enrollments and cart.
    ///
    /// Returns the number of accounts that referenced the course.
    pub fn delete(&self, course_id: &str) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let touched = {
            let mut courses = write_txn.open_table(COURSES)?;
            if courses.remove(course_id)?.is_none() {
                return Err(StoreError::NotFound(format!("Course {course_id}")));
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let referencing: Vec<StoredAccount> = all_json::<StoredAccount, _>(&accounts)?
                .into_iter()
                .filter(|a| a.enrolled_courses.contains(course_id) || a.cart.contains(course_id))
                .collect();

            let now = Utc::now();
            for mut account in referencing.iter().cloned() {
                account.enrolled_courses.remove(course_id);
                account.cart.remove(course_id);
                account.updated_at = now;
                put_json(&mut accounts, &account.id, &account)?;
            }
            referencing.len()
        };
        write_txn.commit()?;

        tracing::info!(course_id, accounts_updated = touched, "Course deleted");
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::database::test_support::temp_db;
    use crate::storage::AccountRepository;

    fn instructor() -> StoredAccount {
        StoredAccount::new("user_teacher", "teacher@example.com", "Tina Teacher", Role::Teacher)
    }

    fn course(price: u64) -> StoredCourse {
        let mut course = StoredCourse::new(&instructor(), "Rust Basics", "Ownership and borrowing", price, "programming");
        course.lectures.push(Lecture {
            title: "Intro".into(),
            video_url: "https://videos.example.com/intro.mp4".into(),
            duration: "10:00".into(),
            free_preview: true,
        });
        course
    }

    #[test]
    fn create_and_get() {
        let (db, _dir) = temp_db();
        let repo = CourseRepository::new(&db);
        let c = course(100);

        repo.create(&c).unwrap();
        assert_eq!(repo.get(&c.id).unwrap(), c);
        assert!(matches!(repo.create(&c), Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn get_missing_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = CourseRepository::new(&db);
        assert!(matches!(repo.get("nope"), Err(StoreError::NotFound(_))));
        assert!(repo.find("nope").unwrap().is_none());
    }

    #[test]
    fn get_many_names_missing_ids() {
        let (db, _dir) = temp_db();
        let repo = CourseRepository::new(&db);
        let c = course(100);
        repo.create(&c).unwrap();

        let ids: BTreeSet<String> = [c.id.clone(), "ghost".to_string()].into();
        match repo.get_many(&ids) {
            Err(StoreError::NotFound(msg)) => assert!(msg.contains("ghost")),
            other => panic!("expected NotFound, got {other:?}"),
        }

        let ids: BTreeSet<String> = [c.id.clone()].into();
        assert_eq!(repo.get_many(&ids).unwrap().len(), 1);
    }

    #[test]
    fn validation_rejects_blank_fields() {
        let mut c = course(10);
        c.title = "  ".into();
        assert!(matches!(c.validate(), Err(StoreError::Invalid(_))));

        let mut c = course(10);
        c.lectures[0].video_url.clear();
        assert!(matches!(c.validate(), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn update_preserves_enrollment_set() {
        let (db, _dir) = temp_db();
        let repo = CourseRepository::new(&db);
        let mut c = course(100);
        c.students_enrolled.insert("acct_1".into());
        repo.create(&c).unwrap();

        let mut edit = c.clone();
        edit.title = "Rust Basics, 2nd edition".into();
        edit.price = 150;
        edit.students_enrolled.clear();

        let written = repo.update(&edit).unwrap();
        assert_eq!(written.title, "Rust Basics, 2nd edition");
        assert_eq!(written.price, 150);
        assert!(written.students_enrolled.contains("acct_1"));
        assert_eq!(repo.get(&c.id).unwrap(), written);
    }

    #[test]
    fn list_by_instructor_filters() {
        let (db, _dir) = temp_db();
        let repo = CourseRepository::new(&db);
        let mine = course(100);
        let mut other = course(50);
        other.instructor_id = "someone_else".into();
        repo.create(&mine).unwrap();
        repo.create(&other).unwrap();

        let listed = repo.list_by_instructor(&mine.instructor_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn delete_strips_course_from_accounts() {
        let (db, _dir) = temp_db();
        let courses = CourseRepository::new(&db);
        let accounts = AccountRepository::new(&db);

        let c = course(100);
        courses.create(&c).unwrap();

        let mut enrolled = StoredAccount::new("user_a", "a@example.com", "A", Role::Student);
        enrolled.enrolled_courses.insert(c.id.clone());
        let mut shopping = StoredAccount::new("user_b", "b@example.com", "B", Role::Student);
        shopping.cart.insert(c.id.clone());
        let bystander = StoredAccount::new("user_c", "c@example.com", "C", Role::Student);
        accounts.create(&enrolled).unwrap();
        accounts.create(&shopping).unwrap();
        accounts.create(&bystander).unwrap();

        assert_eq!(courses.delete(&c.id).unwrap(), 2);
        assert!(courses.find(&c.id).unwrap().is_none());
        assert!(accounts.get(&enrolled.id).unwrap().enrolled_courses.is_empty());
        assert!(accounts.get(&shopping.id).unwrap().cart.is_empty());

        assert!(matches!(courses.delete(&c.id), Err(StoreError::NotFound(_))));
    }
}
