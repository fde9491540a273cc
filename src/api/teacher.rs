// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Instructor dashboard.

use std::collections::BTreeSet;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::CourseAuthor,
    error::ApiError,
    state::AppState,
    storage::{AccountRepository, CourseRepository, Database, StoredCourse},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentContact {
    pub account_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherCourseStats {
    pub course_id: String,
    pub title: String,
    pub price: u64,
    pub students: Vec<StudentContact>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherStatsResponse {
    pub total_courses: usize,
    /// Distinct students across all of the caller's courses
    pub total_students: usize,
    /// Σ price × enrolled students, whole currency units
    pub gross_revenue: u64,
    pub courses: Vec<TeacherCourseStats>,
}

fn course_stats(db: &Database, course: StoredCourse) -> Result<TeacherCourseStats, ApiError> {
    let accounts = AccountRepository::new(db);
    let mut students = Vec::with_capacity(course.students_enrolled.len());
    for account_id in &course.students_enrolled {
        // Deleted accounts are stripped from courses; skip any stragglers
        if let Some(student) = accounts.find(account_id)? {
            students.push(StudentContact {
                account_id: student.id,
                name: student.name,
                email: student.email,
            });
        }
    }
    Ok(TeacherCourseStats {
        course_id: course.id,
        title: course.title,
        price: course.price,
        students,
    })
}

/// The caller's courses with their enrolled students.
#[utoipa::path(
    get,
    path = "/v1/teacher/stats",
    tag = "Teacher",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Instructor statistics", body = TeacherStatsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Teacher role required")
    )
)]
pub async fn get_teacher_stats(
    CourseAuthor(author): CourseAuthor,
    State(state): State<AppState>,
) -> Result<Json<TeacherStatsResponse>, ApiError> {
    let owned = CourseRepository::new(&state.db).list_by_instructor(&author.account.id)?;

    let mut distinct = BTreeSet::new();
    let mut gross_revenue = 0u64;
    let mut courses = Vec::with_capacity(owned.len());
    for course in owned {
        let stats = course_stats(&state.db, course)?;
        gross_revenue = gross_revenue.saturating_add(stats.price.saturating_mul(stats.students.len() as u64));
        distinct.extend(stats.students.iter().map(|s| s.account_id.clone()));
        courses.push(stats);
    }

    Ok(Json(TeacherStatsResponse {
        total_courses: courses.len(),
        total_students: distinct.len(),
        gross_revenue,
        courses,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::database::test_support::temp_db;
    use crate::storage::{EnrollmentRepository, StoredAccount};

    #[test]
    fn stats_list_enrolled_students() {
        let (db, _dir) = temp_db();
        let teacher = StoredAccount::new("user_t", "t@example.com", "Teacher", Role::Teacher);
        let student = StoredAccount::new("user_s", "s@example.com", "Sam", Role::Student);
        AccountRepository::new(&db).create(&teacher).unwrap();
        AccountRepository::new(&db).create(&student).unwrap();
        let course = StoredCourse::new(&teacher, "Rust", "", 300, "programming");
        CourseRepository::new(&db).create(&course).unwrap();
        EnrollmentRepository::new(&db)
            .commit(&student.id, &BTreeSet::from([course.id.clone()]), None)
            .unwrap();

        let stored = CourseRepository::new(&db).get(&course.id).unwrap();
        let stats = course_stats(&db, stored).unwrap();
        assert_eq!(stats.students.len(), 1);
        assert_eq!(stats.students[0].name, "Sam");
        assert_eq!(stats.students[0].email, "s@example.com");
    }
}
