//! Admin dashboard and sweep endpoints

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Dashboard counters
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_books: i64,
    pub total_users: i64,
    pub active_loans: i64,
    /// Active loans past their due date (computed, not the persisted status)
    pub overdue_loans: i64,
    pub active_reservations: i64,
    pub available_books: i64,
    pub borrowed_books: i64,
    pub reserved_books: i64,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Loan,
    Reservation,
    UserRegistration,
}

/// One entry of the recent activity feed
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityEntry {
    pub id: i32,
    pub kind: ActivityKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Result of a sweep run
#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of rows transitioned by this run
    pub updated: u64,
}

/// Dashboard statistics (admin)
#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = AdminStats),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<AdminStats>> {
    claims.require_admin()?;

    let stats = state.services.stats.admin_stats().await?;
    Ok(Json(stats))
}

/// Recent activity feed (admin)
#[utoipa::path(
    get,
    path = "/admin/activity",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Recent activity", body = Vec<ActivityEntry>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    claims.require_admin()?;

    let entries = state.services.stats.recent_activity().await?;
    Ok(Json(entries))
}

/// Overdue sweep: flip active loans past their due date to overdue (admin).
/// Idempotent; invoked here or by an external scheduler, never self-scheduled.
#[utoipa::path(
    post,
    path = "/admin/loans/check-overdue",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = SweepResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn check_overdue_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    claims.require_admin()?;

    let updated = state.services.loans.check_overdue().await?;
    Ok(Json(SweepResponse { updated }))
}

/// Expiry sweep: expire stale reservations and free their books (admin).
/// Idempotent per reservation; safe to rerun.
#[utoipa::path(
    post,
    path = "/admin/reservations/check-expired",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = SweepResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn check_expired_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    claims.require_admin()?;

    let updated = state.services.reservations.check_expired().await?;
    Ok(Json(SweepResponse { updated }))
}
