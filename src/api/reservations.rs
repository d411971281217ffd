//! Reservation lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::reservation::{
        CreateReservation, ReservationDetails, ReservationQuery, ReservationStats,
        UpdateReservation,
    },
};

use super::AuthenticatedUser;

/// Paginated reservation list
#[derive(Serialize, ToSchema)]
pub struct ReservationListResponse {
    pub items: Vec<ReservationDetails>,
    pub total: i64,
}

/// List reservations with filters (admin)
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations", body = ReservationListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<ReservationListResponse>> {
    claims.require_admin()?;

    let (items, total) = state.services.reservations.list(&query).await?;
    Ok(Json(ReservationListResponse { items, total }))
}

/// Get a reservation by id (owner or admin)
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ReservationDetails),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    let reservation = state.services.reservations.get(reservation_id).await?;
    claims.require_self_or_admin(reservation.reservation.user_id)?;
    Ok(Json(reservation))
}

/// Get reservations for a user (self or admin)
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's reservations", body = Vec<ReservationDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_self_or_admin(user_id)?;

    let reservations = state.services.reservations.for_user(user_id).await?;
    Ok(Json(reservations))
}

/// Reserve an available book for the calling user
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = ReservationDetails),
        (status = 400, description = "Book unavailable, duplicate reservation or cap reached"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<ReservationDetails>)> {
    let reservation = state
        .services
        .reservations
        .create(request, claims.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Update a reservation (owner may cancel; admin may set any status)
#[utoipa::path(
    put,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = UpdateReservation,
    responses(
        (status = 200, description = "Updated reservation", body = ReservationDetails),
        (status = 403, description = "Not the owner or not allowed"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
    Json(request): Json<UpdateReservation>,
) -> AppResult<Json<ReservationDetails>> {
    let reservation = state
        .services
        .reservations
        .update(reservation_id, request, &claims)
        .await?;
    Ok(Json(reservation))
}

/// Cancel the caller's own active reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationDetails),
        (status = 400, description = "Not active"),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    let reservation = state
        .services
        .reservations
        .cancel(reservation_id, claims.user_id)
        .await?;
    Ok(Json(reservation))
}

/// Mark an active reservation converted ahead of loan creation (admin)
#[utoipa::path(
    post,
    path = "/reservations/{id}/convert",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation converted", body = ReservationDetails),
        (status = 400, description = "Not active"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn convert_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;

    let reservation = state
        .services
        .reservations
        .convert_to_loan(reservation_id)
        .await?;
    Ok(Json(reservation))
}

/// Reservation statistics (admin)
#[utoipa::path(
    get,
    path = "/reservations/stats",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservation statistics", body = ReservationStats)
    )
)]
pub async fn reservation_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReservationStats>> {
    claims.require_admin()?;

    let stats = state.services.reservations.stats().await?;
    Ok(Json(stats))
}
