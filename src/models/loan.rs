//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::BookDetails;
use super::enums::LoanStatus;
use super::user::UserPublic;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub admin_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

/// Loan with its user, book and administering admin resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub user: UserPublic,
    pub book: BookDetails,
    pub admin: UserPublic,
}

/// Create loan request (admin-initiated)
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub user_id: i32,
    pub book_id: i32,
    /// Defaults to now + the configured loan period when absent
    pub due_date: Option<DateTime<Utc>>,
}

/// Loan field update request (admin)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLoan {
    pub status: Option<LoanStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

/// Extend loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendLoan {
    pub due_date: DateTime<Utc>,
}

/// Query parameters for listing loans
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoanQuery {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub admin_id: Option<i32>,
    pub status: Option<LoanStatus>,
    /// When true, filter by the computed predicate (active and past due),
    /// not by the persisted `overdue` status.
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Counts of loans by persisted status, plus the mean duration of returned
/// loans in whole days
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanStats {
    pub total: i64,
    pub active: i64,
    pub overdue: i64,
    pub returned: i64,
    pub average_duration_days: i64,
}
