//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::user::{UpdateUser, UserPublic},
};

use super::{validate, AuthenticatedUser};

/// Query parameters for listing users
#[derive(Deserialize, IntoParams)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Paginated user list
#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserPublic>,
    pub total: i64,
}

/// List users (admin)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<UserListResponse>> {
    claims.require_admin()?;

    let (items, total) = state
        .services
        .users
        .list(query.page.unwrap_or(1), query.limit.unwrap_or(20))
        .await?;
    Ok(Json(UserListResponse { items, total }))
}

/// Get a user by id (self or admin)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserPublic),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<UserPublic>> {
    claims.require_self_or_admin(user_id)?;
    let user = state.services.users.get(user_id).await?;
    Ok(Json(user))
}

/// Update a user (self for profile fields; admin for role)
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = UserPublic),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
    Json(request): Json<UpdateUser>,
) -> AppResult<Json<UserPublic>> {
    claims.require_self_or_admin(user_id)?;
    if request.role.is_some() {
        claims.require_admin()?;
    }
    validate(&request)?;

    let user = state.services.users.update(user_id, request).await?;
    Ok(Json(user))
}

/// Delete a user (admin)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has loans or reservations")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.users.delete(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
