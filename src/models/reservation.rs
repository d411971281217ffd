//! Reservation model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::BookDetails;
use super::enums::ReservationStatus;
use super::user::UserPublic;

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
}

impl Reservation {
    /// An active reservation whose expiry has passed is eligible for the
    /// expiry sweep.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active
            && self.expires_at.map(|e| e < now).unwrap_or(false)
    }
}

/// Reservation with its user and book resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub user: UserPublic,
    pub book: BookDetails,
}

/// Create reservation request (the reserving user is the caller)
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub book_id: i32,
    /// Defaults to now + the configured reservation period when absent
    pub expires_at: Option<DateTime<Utc>>,
}

/// Reservation status update request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReservation {
    pub status: Option<ReservationStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query parameters for listing reservations
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReservationQuery {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<ReservationStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Counts of reservations by status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationStats {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub converted: i64,
    pub cancelled: i64,
}
