// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{Capability, Role},
    checkout::{EnrollmentReceipt, OrderQuote, VerifyPayment},
    state::AppState,
    storage::{AuditEvent, AuditEventType, Lecture, Note, QuoteStatus, StoredQuote},
};

pub mod accounts;
pub mod admin;
pub mod courses;
pub mod health;
pub mod payments;
pub mod teacher;

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let v1_routes = Router::new()
        .route("/accounts/sync", post(accounts::sync_account))
        .route("/accounts/me", get(accounts::get_me))
        .route("/accounts/me/courses", get(accounts::list_my_courses))
        .route("/accounts/me/orders", get(accounts::list_my_orders))
        .route("/accounts/me/cart", get(accounts::get_cart))
        .route(
            "/accounts/me/cart/{course_id}",
            put(accounts::add_to_cart).delete(accounts::remove_from_cart),
        )
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            "/courses/{course_id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/courses/{course_id}/content", get(courses::get_course_content))
        .route("/payments/checkout", post(payments::checkout))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/teacher/stats", get(teacher::get_teacher_stats))
        .route("/admin/stats", get(admin::get_admin_stats))
        .route("/admin/audit", get(admin::query_audit_log))
        .route(
            "/admin/users/{account_id}",
            axum::routing::delete(admin::delete_user),
        )
        .route("/admin/users/{account_id}/role", put(admin::change_role));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// CORS for a single browser origin, or permissive when none is configured.
pub fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer, String> {
    match allowed_origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|e| format!("invalid CORS origin {origin:?}: {e}"))?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        accounts::sync_account,
        accounts::get_me,
        accounts::list_my_courses,
        accounts::list_my_orders,
        accounts::get_cart,
        accounts::add_to_cart,
        accounts::remove_from_cart,
        courses::list_courses,
        courses::get_course,
        courses::get_course_content,
        courses::create_course,
        courses::update_course,
        courses::delete_course,
        payments::checkout,
        payments::verify_payment,
        teacher::get_teacher_stats,
        admin::get_admin_stats,
        admin::delete_user,
        admin::change_role,
        admin::query_audit_log
    ),
    components(
        schemas(
            Role,
            Capability,
            Lecture,
            Note,
            QuoteStatus,
            StoredQuote,
            AuditEvent,
            AuditEventType,
            OrderQuote,
            VerifyPayment,
            EnrollmentReceipt,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            accounts::SyncAccountRequest,
            accounts::SyncAccountResponse,
            accounts::AccountResponse,
            accounts::CourseCollectionResponse,
            accounts::OrderHistoryResponse,
            courses::CourseView,
            courses::CourseSummary,
            courses::LecturePreview,
            courses::CourseListResponse,
            courses::CourseContentResponse,
            courses::CreateCourseRequest,
            courses::UpdateCourseRequest,
            courses::DeleteCourseResponse,
            payments::CheckoutRequest,
            teacher::TeacherStatsResponse,
            teacher::TeacherCourseStats,
            teacher::StudentContact,
            admin::AdminStatsResponse,
            admin::PlatformTotals,
            admin::AdminInstructorItem,
            admin::AdminStudentItem,
            admin::AdminCourseItem,
            admin::DeleteUserResponse,
            admin::ChangeRoleRequest,
            admin::ChangeRoleResponse,
            admin::AuditLogResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Accounts", description = "Identity sync, profile, cart and orders"),
        (name = "Courses", description = "Course catalog and authoring"),
        (name = "Payments", description = "Checkout and payment verification"),
        (name = "Teacher", description = "Instructor dashboard"),
        (name = "Admin", description = "Platform administration")
    )
)]
struct ApiDoc;
