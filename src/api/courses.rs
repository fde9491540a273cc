// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Course catalog endpoints.
//!
//! The public catalog never exposes lecture video locators (except free
//! previews) or notes. Full content is served by `/content` to enrolled
//! students, the owning instructor, and admins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{CourseAuthor, CurrentAccount},
    error::ApiError,
    state::AppState,
    storage::{
        audit::record, can_view_content, AuditEvent, AuditEventType, CourseRepository, Lecture,
        Note, OwnershipEnforcer, StoreError, StoredAccount, StoredCourse,
    },
};

/// Lecture as shown in the public catalog.
#[derive(Debug, Serialize, ToSchema)]
pub struct LecturePreview {
    pub title: String,
    pub duration: String,
    pub free_preview: bool,
    /// Only present for free preview lectures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Public view of a course.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: u64,
    pub category: String,
    pub instructor_id: String,
    pub instructor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_video: Option<String>,
    pub lectures: Vec<LecturePreview>,
    pub note_count: usize,
    pub student_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredCourse> for CourseView {
    fn from(course: &StoredCourse) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            description: course.description.clone(),
            price: course.price,
            category: course.category.clone(),
            instructor_id: course.instructor_id.clone(),
            instructor_name: course.instructor_name.clone(),
            image: course.image.clone(),
            preview_video: course.preview_video.clone(),
            lectures: course
                .lectures
                .iter()
                .map(|l| LecturePreview {
                    title: l.title.clone(),
                    duration: l.duration.clone(),
                    free_preview: l.free_preview,
                    video_url: l.free_preview.then(|| l.video_url.clone()),
                })
                .collect(),
            note_count: course.notes.len(),
            student_count: course.students_enrolled.len(),
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Compact course entry used in carts, libraries and dashboards.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub price: u64,
    pub instructor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<&StoredCourse> for CourseSummary {
    fn from(course: &StoredCourse) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            price: course.price,
            instructor_name: course.instructor_name.clone(),
            image: course.image.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseListResponse {
    pub courses: Vec<CourseView>,
    pub total: usize,
}

/// Full course material.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseContentResponse {
    pub course_id: String,
    pub title: String,
    pub lectures: Vec<Lecture>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Whole currency units
    pub price: u64,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "previewVideo")]
    pub preview_video: Option<String>,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub category: Option<String>,
    pub image: Option<String>,
    #[serde(alias = "previewVideo")]
    pub preview_video: Option<String>,
    pub lectures: Option<Vec<Lecture>>,
    pub notes: Option<Vec<Note>>,
}

impl UpdateCourseRequest {
    fn apply(self, course: &mut StoredCourse) {
        if let Some(title) = self.title {
            course.title = title;
        }
        if let Some(description) = self.description {
            course.description = description;
        }
        if let Some(price) = self.price {
            course.price = price;
        }
        if let Some(category) = self.category {
            course.category = category;
        }
        if let Some(image) = self.image {
            course.image = Some(image);
        }
        if let Some(preview_video) = self.preview_video {
            course.preview_video = Some(preview_video);
        }
        if let Some(lectures) = self.lectures {
            course.lectures = lectures;
        }
        if let Some(notes) = self.notes {
            course.notes = notes;
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteCourseResponse {
    pub course_id: String,
    /// Accounts whose enrollments or cart referenced the course
    pub accounts_updated: usize,
}

/// Load a course and check that `actor` may modify it.
fn load_for_write(state: &AppState, course_id: &str, actor: &StoredAccount) -> Result<StoredCourse, ApiError> {
    let course = CourseRepository::new(&state.db).get(course_id)?;
    if let Err(e) = course.authorize_write(actor) {
        record(
            &state.db,
            AuditEvent::new(AuditEventType::PermissionDenied)
                .with_actor(&actor.id)
                .with_resource("course", course_id)
                .failed(e.to_string()),
        );
        return Err(e.into());
    }
    Ok(course)
}

/// List the public catalog, newest first.
#[utoipa::path(
    get,
    path = "/v1/courses",
    tag = "Courses",
    responses(
        (status = 200, description = "All courses", body = CourseListResponse)
    )
)]
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<CourseListResponse>, ApiError> {
    let courses: Vec<CourseView> = CourseRepository::new(&state.db)
        .list_all()?
        .iter()
        .map(CourseView::from)
        .collect();
    let total = courses.len();
    Ok(Json(CourseListResponse { courses, total }))
}

#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}",
    tag = "Courses",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseView),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseView>, ApiError> {
    let course = CourseRepository::new(&state.db).get(&course_id)?;
    Ok(Json(CourseView::from(&course)))
}

/// Full lectures and notes for a course the caller may view.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/content",
    tag = "Courses",
    security(("bearer_auth" = [])),
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course content", body = CourseContentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_content(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseContentResponse>, ApiError> {
    let course = CourseRepository::new(&state.db).get(&course_id)?;
    if !can_view_content(&course, &account) {
        return Err(ApiError::forbidden("Enroll in this course to view its content"));
    }
    Ok(Json(CourseContentResponse {
        course_id: course.id,
        title: course.title,
        lectures: course.lectures,
        notes: course.notes,
    }))
}

/// Publish a new course owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/courses",
    tag = "Courses",
    security(("bearer_auth" = [])),
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseView),
        (status = 400, description = "Invalid course"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Teacher role required")
    )
)]
pub async fn create_course(
    CourseAuthor(author): CourseAuthor,
    State(state): State<AppState>,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseView>), ApiError> {
    let mut course = StoredCourse::new(
        &author.account,
        request.title.trim(),
        request.description,
        request.price,
        request.category.trim(),
    );
    course.image = request.image;
    course.preview_video = request.preview_video;
    course.lectures = request.lectures;
    course.notes = request.notes;

    CourseRepository::new(&state.db).create(&course)?;

    tracing::info!(course_id = %course.id, instructor_id = %author.account.id, "Course created");
    audit_log!(&state.db, AuditEventType::CourseCreated, &author.account.id, "course", &course.id);

    Ok((StatusCode::CREATED, Json(CourseView::from(&course))))
}

/// Update a course. Owner or admin only.
#[utoipa::path(
    put,
    path = "/v1/courses/{course_id}",
    tag = "Courses",
    security(("bearer_auth" = [])),
    params(("course_id" = String, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseView),
        (status = 400, description = "Invalid course"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn update_course(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(request): Json<UpdateCourseRequest>,
) -> Result<Json<CourseView>, ApiError> {
    let mut course = load_for_write(&state, &course_id, &account)?;
    request.apply(&mut course);

    let updated = CourseRepository::new(&state.db).update(&course)?;

    tracing::info!(course_id = %updated.id, actor_id = %account.id, "Course updated");
    audit_log!(&state.db, AuditEventType::CourseUpdated, &account.id, "course", &updated.id);

    Ok(Json(CourseView::from(&updated)))
}

/// Delete a course and revoke it from every account. Owner or admin only.
#[utoipa::path(
    delete,
    path = "/v1/courses/{course_id}",
    tag = "Courses",
    security(("bearer_auth" = [])),
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted", body = DeleteCourseResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn delete_course(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<DeleteCourseResponse>, ApiError> {
    let course = load_for_write(&state, &course_id, &account)?;

    let accounts_updated = match CourseRepository::new(&state.db).delete(&course.id) {
        Ok(n) => n,
        // Deleted concurrently between the ownership check and the delete
        Err(StoreError::NotFound(what)) => return Err(ApiError::not_found(format!("{what} not found"))),
        Err(e) => return Err(e.into()),
    };

    if !course.students_enrolled.is_empty() {
        tracing::warn!(
            course_id = %course.id,
            students = course.students_enrolled.len(),
            "Deleted course had enrolled students"
        );
    }
    record(
        &state.db,
        AuditEvent::new(AuditEventType::CourseDeleted)
            .with_actor(&account.id)
            .with_resource("course", &course.id)
            .with_details(serde_json::json!({
                "title": course.title,
                "accounts_updated": accounts_updated,
            })),
    );

    Ok(Json(DeleteCourseResponse {
        course_id: course.id,
        accounts_updated,
    }))
}
