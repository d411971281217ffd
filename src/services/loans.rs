//! Loan lifecycle service
//!
//! Owns every legal transition of a loan and the book status writes that go
//! with it. Each mutating operation runs inside one transaction holding the
//! book row lock, so concurrent claims on the same book serialize; a failed
//! precondition rolls back with no partial writes.

use chrono::Utc;

use crate::{
    config::LifecycleConfig,
    error::{AppError, AppResult},
    models::{
        enums::{BookStatus, LoanStatus, ReservationStatus},
        loan::{CreateLoan, Loan, LoanDetails, LoanQuery, LoanStats, UpdateLoan},
    },
    repository::{
        books::BooksRepository, loans::LoansRepository, reservations::ReservationsRepository,
        users::UsersRepository, Repository,
    },
    services::lifecycle,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LifecycleConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LifecycleConfig) -> Self {
        Self { repository, config }
    }

    /// Get a loan with its associations resolved
    pub async fn get(&self, id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(id).await?;
        self.details(loan).await
    }

    /// List loans with filters and pagination
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.loans.search(query).await
    }

    /// All loans of one user
    pub async fn for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.find_by_user(user_id).await
    }

    /// Lend a book to a user (admin-initiated).
    ///
    /// Precondition order: user exists, book exists, book not borrowed, no
    /// duplicate active loan, loan cap, and for a reserved book an active
    /// reservation by the borrowing user, which is converted in the same
    /// transaction.
    pub async fn create(&self, request: CreateLoan, admin_id: i32) -> AppResult<LoanDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        if !UsersRepository::exists_tx(&mut tx, request.user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let book = BooksRepository::get_for_update_tx(&mut tx, request.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if book.status == BookStatus::Borrowed {
            return Err(AppError::InvalidState(
                "Book is already borrowed".to_string(),
            ));
        }

        if LoansRepository::find_active_tx(&mut tx, request.user_id, request.book_id)
            .await?
            .is_some()
        {
            return Err(AppError::InvalidState(
                "User already has an active loan for this book".to_string(),
            ));
        }

        let active = LoansRepository::count_active_for_user_tx(&mut tx, request.user_id).await?;
        lifecycle::check_loan_cap(active, &self.config)?;

        if book.status == BookStatus::Reserved {
            let reservation =
                ReservationsRepository::find_active_tx(&mut tx, request.user_id, request.book_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InvalidState("Book is reserved by another user".to_string())
                    })?;
            ReservationsRepository::update_fields_tx(
                &mut tx,
                reservation.id,
                Some(ReservationStatus::Converted),
                None,
            )
            .await?;
        }

        let due_date = request
            .due_date
            .unwrap_or_else(|| lifecycle::default_due_date(now, &self.config));

        let loan = LoansRepository::insert_tx(
            &mut tx,
            request.user_id,
            request.book_id,
            admin_id,
            now,
            due_date,
        )
        .await?;
        BooksRepository::set_status_tx(&mut tx, request.book_id, BookStatus::Borrowed).await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            user_id = loan.user_id,
            book_id = loan.book_id,
            "Loan created"
        );
        self.details(loan).await
    }

    /// Update loan fields (admin). A transition to `returned` stamps
    /// `returned_at` and frees the book; re-applying it is a no-op on the
    /// book. Other field writes touch only the loan record.
    pub async fn update(&self, id: i32, update: UpdateLoan) -> AppResult<LoanDetails> {
        let mut tx = self.repository.pool.begin().await?;

        let loan = LoansRepository::get_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Loan not found".to_string()))?;

        let mut returning =
            update.status == Some(LoanStatus::Returned) && loan.status != LoanStatus::Returned;

        if returning {
            // Lock the book before the paired writes so a concurrent
            // CreateLoan cannot interleave
            BooksRepository::get_for_update_tx(&mut tx, loan.book_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

            // Re-read under the lock; another return may have committed
            // while waiting for it, and the book could already be lent out
            // again
            let current = LoansRepository::get_tx(&mut tx, id)
                .await?
                .ok_or_else(|| AppError::NotFound("Loan not found".to_string()))?;
            returning = current.status != LoanStatus::Returned;
        }

        let returned_at = if returning {
            Some(update.returned_at.unwrap_or_else(Utc::now))
        } else {
            update.returned_at
        };

        let updated =
            LoansRepository::update_fields_tx(&mut tx, id, update.status, update.due_date, returned_at)
                .await?;

        if returning {
            BooksRepository::set_status_tx(&mut tx, loan.book_id, BookStatus::Available).await?;
        }

        tx.commit().await?;

        if returning {
            tracing::info!(loan_id = id, book_id = loan.book_id, "Loan returned");
        }
        self.details(updated).await
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, id: i32) -> AppResult<LoanDetails> {
        self.update(
            id,
            UpdateLoan {
                status: Some(LoanStatus::Returned),
                due_date: None,
                returned_at: Some(Utc::now()),
            },
        )
        .await
    }

    /// Extend an active loan's due date, bounded by the configured window
    pub async fn extend(&self, id: i32, new_due: chrono::DateTime<Utc>) -> AppResult<LoanDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let loan = LoansRepository::get_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Loan not found".to_string()))?;

        if loan.status != LoanStatus::Active {
            return Err(AppError::InvalidState(
                "Only active loans can be extended".to_string(),
            ));
        }

        lifecycle::check_extension(now, loan.due_date, new_due, &self.config)?;

        let updated =
            LoansRepository::update_fields_tx(&mut tx, id, None, Some(new_due), None).await?;
        tx.commit().await?;

        tracing::info!(loan_id = id, due_date = %new_due, "Loan extended");
        self.details(updated).await
    }

    /// Overdue sweep: flip every active loan past its due date to `overdue`.
    /// Pure status flip; the book stays borrowed. Idempotent, so the caller
    /// may retry the whole sweep.
    pub async fn check_overdue(&self) -> AppResult<u64> {
        let flipped = self.repository.loans.mark_overdue(Utc::now()).await?;
        if flipped > 0 {
            tracing::info!(count = flipped, "Marked loans overdue");
        }
        Ok(flipped)
    }

    /// Counts by persisted status plus average returned-loan duration
    pub async fn stats(&self) -> AppResult<LoanStats> {
        self.repository.loans.stats().await
    }

    async fn details(&self, loan: Loan) -> AppResult<LoanDetails> {
        let mut hydrated = self.repository.loans.hydrate(vec![loan]).await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::Internal("Loan hydration returned nothing".to_string()))
    }
}
