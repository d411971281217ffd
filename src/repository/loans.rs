//! Loans repository for database operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::LoanStatus,
        loan::{Loan, LoanDetails, LoanQuery, LoanStats},
        user::UserPublic,
    },
};

use super::books::BooksRepository;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Loan not found".to_string()))
    }

    /// Read a loan inside a lifecycle transaction
    pub async fn get_tx(conn: &mut PgConnection, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(loan)
    }

    /// The user's active loan for this book, if any
    pub async fn find_active_tx(
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 AND book_id = $2 AND status = 'active'",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(conn)
        .await?;
        Ok(loan)
    }

    /// Number of active loans a user currently holds
    pub async fn count_active_for_user_tx(conn: &mut PgConnection, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Insert a new active loan inside a lifecycle transaction
    pub async fn insert_tx(
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        admin_id: i32,
        borrowed_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, admin_id, borrowed_at, due_date, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(admin_id)
        .bind(borrowed_at)
        .bind(due_date)
        .fetch_one(conn)
        .await?;
        Ok(loan)
    }

    /// Apply loan field updates inside a lifecycle transaction; only provided
    /// fields change
    pub async fn update_fields_tx(
        conn: &mut PgConnection,
        id: i32,
        status: Option<LoanStatus>,
        due_date: Option<DateTime<Utc>>,
        returned_at: Option<DateTime<Utc>>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET status = COALESCE($2, status),
                due_date = COALESCE($3, due_date),
                returned_at = COALESCE($4, returned_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(due_date)
        .bind(returned_at)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Loan not found".to_string()))?;
        Ok(loan)
    }

    /// Flip every running loan past its due date to `overdue`. One idempotent
    /// statement; loans already overdue or returned are untouched.
    pub async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE loans SET status = 'overdue' WHERE status = 'active' AND due_date < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Search loans with optional filters, paginated, newest first.
    /// `overdue: true` filters by the computed predicate (active and past
    /// due), not by the persisted `overdue` status.
    pub async fn search(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let page = query.page.unwrap_or(1).clamp(1, 1_000_000);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let now = Utc::now();

        const WHERE: &str = r#"
            ($1::int IS NULL OR user_id = $1)
            AND ($2::int IS NULL OR book_id = $2)
            AND ($3::int IS NULL OR admin_id = $3)
            AND ($4::loan_status IS NULL OR status = $4)
            AND (NOT $5::bool OR (status = 'active' AND due_date < $6))
        "#;

        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT * FROM loans WHERE {WHERE} ORDER BY borrowed_at DESC OFFSET $7 LIMIT $8"
        ))
        .bind(query.user_id)
        .bind(query.book_id)
        .bind(query.admin_id)
        .bind(query.status)
        .bind(query.overdue.unwrap_or(false))
        .bind(now)
        .bind((page - 1) * limit)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM loans WHERE {WHERE}"))
            .bind(query.user_id)
            .bind(query.book_id)
            .bind(query.admin_id)
            .bind(query.status)
            .bind(query.overdue.unwrap_or(false))
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        let details = self.hydrate(loans).await?;
        Ok((details, total))
    }

    /// All loans of one user, newest first
    pub async fn find_by_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY borrowed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(loans).await
    }

    /// Most recent loans, for the admin activity feed
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<LoanDetails>> {
        let loans =
            sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY borrowed_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        self.hydrate(loans).await
    }

    /// Count of loans matching the computed overdue predicate
    pub async fn count_overdue_predicate(&self, now: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'active' AND due_date < $1",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count of active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Counts by persisted status plus the mean duration of returned loans,
    /// in whole days, rounded
    pub async fn stats(&self) -> AppResult<LoanStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'active') AS active,
                   COUNT(*) FILTER (WHERE status = 'overdue') AS overdue,
                   COUNT(*) FILTER (WHERE status = 'returned') AS returned,
                   COALESCE(ROUND(AVG(
                       EXTRACT(EPOCH FROM (returned_at - borrowed_at)) / 86400.0
                   ) FILTER (WHERE status = 'returned' AND returned_at IS NOT NULL)), 0)::bigint
                       AS average_duration_days
            FROM loans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LoanStats {
            total: row.get("total"),
            active: row.get("active"),
            overdue: row.get("overdue"),
            returned: row.get("returned"),
            average_duration_days: row.get("average_duration_days"),
        })
    }

    /// Resolve user/book/admin associations for a page of loans
    pub async fn hydrate(&self, loans: Vec<Loan>) -> AppResult<Vec<LoanDetails>> {
        let mut user_ids: Vec<i32> = loans
            .iter()
            .flat_map(|l| [l.user_id, l.admin_id])
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let book_ids: Vec<i32> = loans.iter().map(|l| l.book_id).collect();

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

        let mut details = Vec::with_capacity(loans.len());
        for loan in loans {
            let user = users
                .get(&loan.user_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("Missing user {}", loan.user_id)))?;
            let admin = users
                .get(&loan.admin_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("Missing user {}", loan.admin_id)))?;
            let book = books
                .get(&loan.book_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("Missing book {}", loan.book_id)))?;
            details.push(LoanDetails {
                loan,
                user,
                book,
                admin,
            });
        }
        Ok(details)
    }
}
