// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only endpoints.
//!
//! These require the `admin-manage` capability and provide:
//! - Platform statistics with instructor, student and course listings
//! - User removal and role changes
//! - Audit log queries

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{PlatformAdmin, Role},
    error::ApiError,
    state::AppState,
    storage::{
        audit::record, AccountRepository, AuditEvent, AuditEventType, AuditQuery, AuditRepository,
        CourseRepository, StoredAccount, StoredCourse,
    },
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformTotals {
    pub total_users: usize,
    pub total_instructors: usize,
    pub total_students: usize,
    pub total_courses: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminInstructorItem {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub courses_uploaded: usize,
    pub course_titles: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStudentItem {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub enrolled_count: usize,
    pub enrolled_course_titles: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCourseItem {
    pub course_id: String,
    pub title: String,
    pub price: u64,
    pub category: String,
    pub instructor_name: String,
    /// Current email of the instructor; absent if the account was removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_email: Option<String>,
    pub student_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStatsResponse {
    pub stats: PlatformTotals,
    pub instructors: Vec<AdminInstructorItem>,
    pub students: Vec<AdminStudentItem>,
    pub courses: Vec<AdminCourseItem>,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteUserResponse {
    pub account_id: String,
    /// Courses the account was removed from
    pub courses_updated: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChangeRoleResponse {
    pub account_id: String,
    pub previous_role: Role,
    pub role: Role,
}

/// Query parameters for audit log queries.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Day to read (YYYY-MM-DD, UTC). Defaults to today.
    pub date: Option<String>,
    /// Filter by event type (e.g. `payment_rejected`).
    pub event_type: Option<String>,
    /// Filter by acting account id.
    pub actor_id: Option<String>,
    /// Maximum number of results (default 100, max 1000).
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    pub count: usize,
}

const MAX_AUDIT_LIMIT: usize = 1000;

// ============================================================================
// Aggregation
// ============================================================================

fn build_stats(
    accounts: &[StoredAccount],
    courses: &[StoredCourse],
) -> (
    PlatformTotals,
    Vec<AdminInstructorItem>,
    Vec<AdminStudentItem>,
    Vec<AdminCourseItem>,
) {
    let instructors: Vec<AdminInstructorItem> = accounts
        .iter()
        .filter(|a| a.role == Role::Teacher)
        .map(|a| {
            let titles: Vec<String> = courses
                .iter()
                .filter(|c| c.instructor_id == a.id)
                .map(|c| c.title.clone())
                .collect();
            AdminInstructorItem {
                account_id: a.id.clone(),
                name: a.name.clone(),
                email: a.email.clone(),
                courses_uploaded: titles.len(),
                course_titles: titles,
            }
        })
        .collect();

    // Enrollment is read from the course side, as the listing shows courses
    let students: Vec<AdminStudentItem> = accounts
        .iter()
        .filter(|a| a.role == Role::Student)
        .map(|a| {
            let titles: Vec<String> = courses
                .iter()
                .filter(|c| c.students_enrolled.contains(&a.id))
                .map(|c| c.title.clone())
                .collect();
            AdminStudentItem {
                account_id: a.id.clone(),
                name: a.name.clone(),
                email: a.email.clone(),
                enrolled_count: titles.len(),
                enrolled_course_titles: titles,
            }
        })
        .collect();

    let course_items = courses
        .iter()
        .map(|c| AdminCourseItem {
            course_id: c.id.clone(),
            title: c.title.clone(),
            price: c.price,
            category: c.category.clone(),
            instructor_name: c.instructor_name.clone(),
            instructor_email: accounts
                .iter()
                .find(|a| a.id == c.instructor_id)
                .map(|a| a.email.clone()),
            student_count: c.students_enrolled.len(),
        })
        .collect();

    let totals = PlatformTotals {
        total_users: accounts.len(),
        total_instructors: instructors.len(),
        total_students: students.len(),
        total_courses: courses.len(),
    };
    (totals, instructors, students, course_items)
}

// ============================================================================
// Handlers
// ============================================================================

/// Platform statistics.
#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Platform statistics", body = AdminStatsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn get_admin_stats(
    PlatformAdmin(_admin): PlatformAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    let accounts = AccountRepository::new(&state.db).list_all()?;
    let courses = CourseRepository::new(&state.db).list_all()?;
    let (stats, instructors, students, courses) = build_stats(&accounts, &courses);

    Ok(Json(AdminStatsResponse {
        stats,
        instructors,
        students,
        courses,
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Remove a user and their enrollments.
#[utoipa::path(
    delete,
    path = "/v1/admin/users/{account_id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("account_id" = String, Path, description = "Local account id")),
    responses(
        (status = 200, description = "User removed", body = DeleteUserResponse),
        (status = 400, description = "Cannot remove yourself"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    PlatformAdmin(admin): PlatformAdmin,
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    if account_id == admin.account.id {
        return Err(ApiError::bad_request("Admins cannot remove their own account"));
    }

    let courses_updated = AccountRepository::new(&state.db).delete(&account_id)?;

    record(
        &state.db,
        AuditEvent::new(AuditEventType::AccountDeleted)
            .with_actor(&admin.account.id)
            .with_resource("account", &account_id)
            .with_details(serde_json::json!({ "courses_updated": courses_updated })),
    );

    Ok(Json(DeleteUserResponse {
        account_id,
        courses_updated,
    }))
}

/// Change a user's role.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{account_id}/role",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("account_id" = String, Path, description = "Local account id")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ChangeRoleResponse),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found")
    )
)]
pub async fn change_role(
    PlatformAdmin(admin): PlatformAdmin,
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<Json<ChangeRoleResponse>, ApiError> {
    let accounts = AccountRepository::new(&state.db);
    let previous_role = accounts.get(&account_id)?.role;
    let updated = accounts.set_role(&account_id, request.role)?;

    tracing::info!(
        account_id = %updated.id,
        actor_id = %admin.account.id,
        from = %previous_role,
        to = %updated.role,
        "Role changed"
    );
    record(
        &state.db,
        AuditEvent::new(AuditEventType::RoleChanged)
            .with_actor(&admin.account.id)
            .with_resource("account", &updated.id)
            .with_details(serde_json::json!({ "from": previous_role, "to": updated.role })),
    );

    Ok(Json(ChangeRoleResponse {
        account_id: updated.id,
        previous_role,
        role: updated.role,
    }))
}

/// Query one day of the audit log.
#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(AuditQueryParams),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid query"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn query_audit_log(
    PlatformAdmin(_admin): PlatformAdmin,
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let date = match params.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request("Invalid date format. Use YYYY-MM-DD."))?,
        None => Utc::now().date_naive(),
    };

    let mut query = AuditQuery::for_date(date);
    if let Some(raw) = params.event_type.as_deref() {
        let event_type = serde_json::from_value(serde_json::Value::String(raw.to_string()))
            .map_err(|_| ApiError::bad_request(format!("Unknown event type: {raw}")))?;
        query.event_type = Some(event_type);
    }
    query.actor_id = params.actor_id;
    query.limit = params.limit.unwrap_or(query.limit).clamp(1, MAX_AUDIT_LIMIT);
    query.offset = params.offset.unwrap_or(0);

    let events = AuditRepository::new(&state.db).query(&query)?;
    Ok(Json(AuditLogResponse {
        count: events.len(),
        events,
    }))
}
