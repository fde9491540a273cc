// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: identity sync, profile, cart, library and orders.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::courses::CourseSummary;
use crate::{
    auth::{Auth, Capability, CurrentAccount, Role},
    error::ApiError,
    identity::IdentitySync,
    state::AppState,
    storage::{AccountRepository, CourseRepository, Database, QuoteRepository, StoredAccount, StoredQuote},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SyncAccountRequest {
    /// Role to create the account with: `student` (default) or `teacher`.
    /// Ignored when the account already exists.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub capabilities: Vec<Capability>,
    pub enrolled_course_ids: Vec<String>,
    pub cart: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredAccount> for AccountResponse {
    fn from(account: &StoredAccount) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            capabilities: account.role.capabilities().to_vec(),
            enrolled_course_ids: account.enrolled_courses.iter().cloned().collect(),
            cart: account.cart.iter().cloned().collect(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncAccountResponse {
    pub account: AccountResponse,
    /// The account was created by this call
    pub created: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseCollectionResponse {
    pub courses: Vec<CourseSummary>,
    /// Sum of listed course prices
    pub subtotal: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderHistoryResponse {
    pub orders: Vec<StoredQuote>,
}

/// Summaries for the given ids, skipping courses that no longer exist.
fn summaries<'a>(
    db: &Database,
    ids: impl IntoIterator<Item = &'a String>,
) -> Result<CourseCollectionResponse, ApiError> {
    let repo = CourseRepository::new(db);
    let mut courses = Vec::new();
    for id in ids {
        if let Some(course) = repo.find(id)? {
            courses.push(CourseSummary::from(&course));
        }
    }
    let subtotal = courses.iter().fold(0u64, |sum, c| sum.saturating_add(c.price));
    Ok(CourseCollectionResponse { courses, subtotal })
}

/// Create the caller's account on first sign-in, or return the existing one.
#[utoipa::path(
    post,
    path = "/v1/accounts/sync",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    request_body = SyncAccountRequest,
    responses(
        (status = 200, description = "Existing account", body = SyncAccountResponse),
        (status = 201, description = "Account created", body = SyncAccountResponse),
        (status = 400, description = "Unknown role or no email for identity"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Role cannot be self-assigned")
    )
)]
pub async fn sync_account(
    Auth(identity): Auth,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SyncAccountResponse>), ApiError> {
    // The body is optional
    let request: SyncAccountRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SyncAccountRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?
    };
    let declared_role = match request.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(name) => Some(
            Role::parse(name).ok_or_else(|| ApiError::bad_request(format!("Unknown role: {name}")))?,
        ),
        None => None,
    };

    let outcome = IdentitySync::new(&state.db, state.directory.as_deref())
        .sync(&identity, declared_role)
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(SyncAccountResponse {
            account: AccountResponse::from(&outcome.account),
            created: outcome.created,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/accounts/me",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account not synced")
    )
)]
pub async fn get_me(CurrentAccount { account, .. }: CurrentAccount) -> Json<AccountResponse> {
    Json(AccountResponse::from(&account))
}

/// Courses the caller is enrolled in.
#[utoipa::path(
    get,
    path = "/v1/accounts/me/courses",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Enrolled courses", body = CourseCollectionResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_my_courses(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
) -> Result<Json<CourseCollectionResponse>, ApiError> {
    Ok(Json(summaries(&state.db, &account.enrolled_courses)?))
}

#[utoipa::path(
    get,
    path = "/v1/accounts/me/cart",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cart contents", body = CourseCollectionResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_cart(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
) -> Result<Json<CourseCollectionResponse>, ApiError> {
    Ok(Json(summaries(&state.db, &account.cart)?))
}

#[utoipa::path(
    put,
    path = "/v1/accounts/me/cart/{course_id}",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Updated cart", body = CourseCollectionResponse),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Already enrolled")
    )
)]
pub async fn add_to_cart(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseCollectionResponse>, ApiError> {
    let account = AccountRepository::new(&state.db).add_to_cart(&account.id, &course_id)?;
    Ok(Json(summaries(&state.db, &account.cart)?))
}

#[utoipa::path(
    delete,
    path = "/v1/accounts/me/cart/{course_id}",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Updated cart", body = CourseCollectionResponse)
    )
)]
pub async fn remove_from_cart(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseCollectionResponse>, ApiError> {
    let account = AccountRepository::new(&state.db).remove_from_cart(&account.id, &course_id)?;
    Ok(Json(summaries(&state.db, &account.cart)?))
}

/// The caller's checkout quotes, newest first.
#[utoipa::path(
    get,
    path = "/v1/accounts/me/orders",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order history", body = OrderHistoryResponse)
    )
)]
pub async fn list_my_orders(
    CurrentAccount { account, .. }: CurrentAccount,
    State(state): State<AppState>,
) -> Result<Json<OrderHistoryResponse>, ApiError> {
    let orders = QuoteRepository::new(&state.db).list_by_account(&account.id)?;
    Ok(Json(OrderHistoryResponse { orders }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_response_lists_capabilities() {
        let account = StoredAccount::new("user_1", "t@example.com", "Teacher", Role::Teacher);
        let response = AccountResponse::from(&account);
        assert_eq!(
            response.capabilities,
            vec![Capability::ReadCourse, Capability::WriteOwnCourse]
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "teacher");
        assert_eq!(json["capabilities"][1], "write-own-course");
    }
}
