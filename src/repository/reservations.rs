//! Reservations repository for database operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ReservationStatus,
        reservation::{
            Reservation, ReservationDetails, ReservationQuery, ReservationStats,
        },
        user::UserPublic,
    },
};

use super::books::BooksRepository;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
    }

    /// Read a reservation inside a lifecycle transaction
    pub async fn get_tx(conn: &mut PgConnection, id: i32) -> AppResult<Option<Reservation>> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        Ok(reservation)
    }

    /// The active reservation held by this user on this book, if any
    pub async fn find_active_tx(
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 AND book_id = $2 AND status = 'active'",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(conn)
        .await?;
        Ok(reservation)
    }

    /// Number of active reservations a user currently holds
    pub async fn count_active_for_user_tx(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Insert a new active reservation inside a lifecycle transaction
    pub async fn insert_tx(
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        reserved_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, book_id, reserved_at, expires_at, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(reserved_at)
        .bind(expires_at)
        .fetch_one(conn)
        .await?;
        Ok(reservation)
    }

    /// Apply reservation field updates inside a lifecycle transaction
    pub async fn update_fields_tx(
        conn: &mut PgConnection,
        id: i32,
        status: Option<ReservationStatus>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET status = COALESCE($2, status),
                expires_at = COALESCE($3, expires_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(expires_at)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;
        Ok(reservation)
    }

    /// Active reservations whose expiry has passed, read without locks.
    /// The sweep re-checks each candidate under its book lock before writing.
    pub async fn expired_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at < $1
            ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// Search reservations with optional filters, paginated, newest first
    pub async fn search(
        &self,
        query: &ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let page = query.page.unwrap_or(1).clamp(1, 1_000_000);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);

        const WHERE: &str = r#"
            ($1::int IS NULL OR user_id = $1)
            AND ($2::int IS NULL OR book_id = $2)
            AND ($3::reservation_status IS NULL OR status = $3)
        "#;

        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT * FROM reservations WHERE {WHERE} ORDER BY reserved_at DESC OFFSET $4 LIMIT $5"
        ))
        .bind(query.user_id)
        .bind(query.book_id)
        .bind(query.status)
        .bind((page - 1) * limit)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM reservations WHERE {WHERE}"))
                .bind(query.user_id)
                .bind(query.book_id)
                .bind(query.status)
                .fetch_one(&self.pool)
                .await?;

        let details = self.hydrate(reservations).await?;
        Ok((details, total))
    }

    /// All reservations of one user, newest first
    pub async fn find_by_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 ORDER BY reserved_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(reservations).await
    }

    /// Most recent reservations, for the admin activity feed
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<ReservationDetails>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations ORDER BY reserved_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(reservations).await
    }

    /// Count of active reservations
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Counts of reservations by status
    pub async fn stats(&self) -> AppResult<ReservationStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'active') AS active,
                   COUNT(*) FILTER (WHERE status = 'expired') AS expired,
                   COUNT(*) FILTER (WHERE status = 'converted') AS converted,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM reservations
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ReservationStats {
            total: row.get("total"),
            active: row.get("active"),
            expired: row.get("expired"),
            converted: row.get("converted"),
            cancelled: row.get("cancelled"),
        })
    }

    /// Resolve user/book associations for a page of reservations
    pub async fn hydrate(
        &self,
        reservations: Vec<Reservation>,
    ) -> AppResult<Vec<ReservationDetails>> {
        let mut user_ids: Vec<i32> = reservations.iter().map(|r| r.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let book_ids: Vec<i32> = reservations.iter().map(|r| r.book_id).collect();

        let users: HashMap<i32, UserPublic> = sqlx::query_as::<_, UserPublic>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = ANY($1)",
        )
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

        let books = BooksRepository::new(self.pool.clone())
            .get_details_by_ids(&book_ids)
            .await?;
        let books: HashMap<i32, _> = books.into_iter().map(|b| (b.book.id, b)).collect();

        let mut details = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            let user = users.get(&reservation.user_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("Missing user {}", reservation.user_id))
            })?;
            let book = books.get(&reservation.book_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("Missing book {}", reservation.book_id))
            })?;
            details.push(ReservationDetails {
                reservation,
                user,
                book,
            });
        }
        Ok(details)
    }
}
