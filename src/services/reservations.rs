//! Reservation lifecycle service
//!
//! Mirrors the loan service: every mutation that pairs a reservation write
//! with a book status write runs under the book row lock, including the
//! expiry sweep, which re-checks each candidate under the lock so live and
//! sweep paths cannot resurrect a stale book status.

use chrono::{DateTime, Utc};

use crate::{
    config::LifecycleConfig,
    error::{AppError, AppResult},
    models::{
        enums::{BookStatus, ReservationStatus},
        reservation::{
            CreateReservation, Reservation, ReservationDetails, ReservationQuery,
            ReservationStats, UpdateReservation,
        },
        user::UserClaims,
    },
    repository::{
        books::BooksRepository, reservations::ReservationsRepository, Repository,
    },
    services::lifecycle,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    config: LifecycleConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, config: LifecycleConfig) -> Self {
        Self { repository, config }
    }

    /// Get a reservation with its associations resolved
    pub async fn get(&self, id: i32) -> AppResult<ReservationDetails> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        self.details(reservation).await
    }

    /// List reservations with filters and pagination
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.repository.reservations.search(query).await
    }

    /// All reservations of one user
    pub async fn for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.reservations.find_by_user(user_id).await
    }

    /// Reserve an available book for the calling user.
    ///
    /// Precondition order: book exists, book available, no duplicate active
    /// reservation, reservation cap.
    pub async fn create(
        &self,
        request: CreateReservation,
        user_id: i32,
    ) -> AppResult<ReservationDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let book = BooksRepository::get_for_update_tx(&mut tx, request.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if book.status != BookStatus::Available {
            return Err(AppError::InvalidState(
                "Book is not available for reservation".to_string(),
            ));
        }

        if ReservationsRepository::find_active_tx(&mut tx, user_id, request.book_id)
            .await?
            .is_some()
        {
            return Err(AppError::InvalidState(
                "You already have an active reservation for this book".to_string(),
            ));
        }

        let active = ReservationsRepository::count_active_for_user_tx(&mut tx, user_id).await?;
        lifecycle::check_reservation_cap(active, &self.config)?;

        let expires_at = request
            .expires_at
            .unwrap_or_else(|| lifecycle::default_expires_at(now, &self.config));

        let reservation =
            ReservationsRepository::insert_tx(&mut tx, user_id, request.book_id, now, Some(expires_at))
                .await?;
        BooksRepository::set_status_tx(&mut tx, request.book_id, BookStatus::Reserved).await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = reservation.id,
            user_id,
            book_id = reservation.book_id,
            "Reservation created"
        );
        self.details(reservation).await
    }

    /// Update a reservation. Owners may only cancel; admins may set any
    /// status. Cancelling or expiring the active reservation frees the book.
    /// A direct admin write to `converted` does not create a loan.
    pub async fn update(
        &self,
        id: i32,
        update: UpdateReservation,
        caller: &UserClaims,
    ) -> AppResult<ReservationDetails> {
        let existing = self.repository.reservations.get_by_id(id).await?;

        if !caller.is_admin() && existing.user_id != caller.user_id {
            return Err(AppError::Forbidden(
                "You can only modify your own reservations".to_string(),
            ));
        }
        if !caller.is_admin()
            && update.status.is_some()
            && update.status != Some(ReservationStatus::Cancelled)
        {
            return Err(AppError::Forbidden(
                "Users can only cancel their own reservations".to_string(),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;

        BooksRepository::get_for_update_tx(&mut tx, existing.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        // Re-read under the lock; the status may have moved since the
        // authorization check
        let current = ReservationsRepository::get_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

        let updated =
            ReservationsRepository::update_fields_tx(&mut tx, id, update.status, update.expires_at)
                .await?;

        let releasing = matches!(
            update.status,
            Some(ReservationStatus::Cancelled) | Some(ReservationStatus::Expired)
        ) && current.status == ReservationStatus::Active;

        if releasing {
            BooksRepository::set_status_tx(&mut tx, existing.book_id, BookStatus::Available)
                .await?;
        }

        tx.commit().await?;

        if releasing {
            tracing::info!(
                reservation_id = id,
                book_id = existing.book_id,
                status = %updated.status,
                "Reservation released its book"
            );
        }
        self.details(updated).await
    }

    /// Cancel the caller's own active reservation
    pub async fn cancel(&self, id: i32, user_id: i32) -> AppResult<ReservationDetails> {
        let reservation = self
            .repository
            .reservations
            .get_by_id(id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => not_yours(),
                other => other,
            })?;
        if reservation.user_id != user_id {
            return Err(not_yours());
        }
        if reservation.status != ReservationStatus::Active {
            return Err(AppError::InvalidState(
                "Only active reservations can be cancelled".to_string(),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;
        BooksRepository::get_for_update_tx(&mut tx, reservation.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let current = ReservationsRepository::get_tx(&mut tx, id)
            .await?
            .ok_or_else(|| not_yours())?;
        if current.status != ReservationStatus::Active {
            return Err(AppError::InvalidState(
                "Only active reservations can be cancelled".to_string(),
            ));
        }

        let updated = ReservationsRepository::update_fields_tx(
            &mut tx,
            id,
            Some(ReservationStatus::Cancelled),
            None,
        )
        .await?;
        BooksRepository::set_status_tx(&mut tx, reservation.book_id, BookStatus::Available)
            .await?;
        tx.commit().await?;

        tracing::info!(reservation_id = id, user_id, "Reservation cancelled");
        self.details(updated).await
    }

    /// Mark an active reservation `converted` ahead of the loan the admin
    /// workflow creates next. Does not itself create the loan or touch the
    /// book.
    pub async fn convert_to_loan(&self, id: i32) -> AppResult<ReservationDetails> {
        let existing = self.repository.reservations.get_by_id(id).await?;

        let mut tx = self.repository.pool.begin().await?;

        // Take the book lock so the conversion cannot interleave with the
        // expiry sweep's re-check on the same reservation
        BooksRepository::get_for_update_tx(&mut tx, existing.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let reservation = ReservationsRepository::get_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

        if reservation.status != ReservationStatus::Active {
            return Err(AppError::InvalidState(
                "Only active reservations can be converted to loans".to_string(),
            ));
        }

        let updated = ReservationsRepository::update_fields_tx(
            &mut tx,
            id,
            Some(ReservationStatus::Converted),
            None,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(reservation_id = id, "Reservation converted to loan");
        self.details(updated).await
    }

    /// Expiry sweep: mark stale active reservations `expired` and free their
    /// books. Each candidate is re-checked under its book lock, making the
    /// per-row update idempotent and safe against a concurrent CreateLoan or
    /// CreateReservation on the same book.
    pub async fn check_expired(&self) -> AppResult<u64> {
        let now = Utc::now();
        let candidates = self.repository.reservations.expired_candidates(now).await?;

        let mut expired = 0u64;
        for candidate in candidates {
            if self.expire_one(&candidate, now).await? {
                expired += 1;
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expired stale reservations");
        }
        Ok(expired)
    }

    async fn expire_one(&self, candidate: &Reservation, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.repository.pool.begin().await?;

        let book = match BooksRepository::get_for_update_tx(&mut tx, candidate.book_id).await? {
            Some(book) => book,
            None => return Ok(false),
        };

        // The reservation may have been cancelled or converted since the
        // unlocked candidate read
        let current = match ReservationsRepository::get_tx(&mut tx, candidate.id).await? {
            Some(r) if r.is_expired(now) => r,
            _ => return Ok(false),
        };

        ReservationsRepository::update_fields_tx(
            &mut tx,
            current.id,
            Some(ReservationStatus::Expired),
            None,
        )
        .await?;

        // Only free a book this reservation still holds; a book already
        // re-claimed keeps its current status
        if book.status == BookStatus::Reserved {
            BooksRepository::set_status_tx(&mut tx, book.id, BookStatus::Available).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Counts of reservations by status
    pub async fn stats(&self) -> AppResult<ReservationStats> {
        self.repository.reservations.stats().await
    }

    async fn details(&self, reservation: Reservation) -> AppResult<ReservationDetails> {
        let mut hydrated = self
            .repository
            .reservations
            .hydrate(vec![reservation])
            .await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::Internal("Reservation hydration returned nothing".to_string()))
    }
}

fn not_yours() -> AppError {
    AppError::NotFound("Reservation not found or does not belong to you".to_string())
}
