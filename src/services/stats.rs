//! Statistics service for the admin dashboard

use chrono::Utc;

use crate::{
    api::admin::{ActivityEntry, ActivityKind, AdminStats},
    error::AppResult,
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Dashboard counters.
    ///
    /// The overdue figure is the computed predicate (active and past due),
    /// not the persisted `overdue` status, so it is correct even before a
    /// sweep has run.
    pub async fn admin_stats(&self) -> AppResult<AdminStats> {
        let now = Utc::now();
        let books = self.repository.books.stats().await?;
        let total_users = self.repository.users.count().await?;
        let active_loans = self.repository.loans.count_active().await?;
        let overdue_loans = self.repository.loans.count_overdue_predicate(now).await?;
        let active_reservations = self.repository.reservations.count_active().await?;

        Ok(AdminStats {
            total_books: books.total,
            total_users,
            active_loans,
            overdue_loans,
            active_reservations,
            available_books: books.available,
            borrowed_books: books.borrowed,
            reserved_books: books.reserved,
        })
    }

    /// Latest loans, reservations and registrations merged into one feed
    pub async fn recent_activity(&self) -> AppResult<Vec<ActivityEntry>> {
        let loans = self.repository.loans.recent(10).await?;
        let reservations = self.repository.reservations.recent(10).await?;
        let users = self.repository.users.recent(5).await?;

        let mut entries = Vec::new();

        for loan in loans {
            entries.push(ActivityEntry {
                id: loan.loan.id,
                kind: ActivityKind::Loan,
                description: format!("{} borrowed \"{}\"", loan.user.name, loan.book.book.title),
                occurred_at: loan.loan.borrowed_at,
            });
        }
        for reservation in reservations {
            entries.push(ActivityEntry {
                id: reservation.reservation.id,
                kind: ActivityKind::Reservation,
                description: format!(
                    "{} reserved \"{}\"",
                    reservation.user.name, reservation.book.book.title
                ),
                occurred_at: reservation.reservation.reserved_at,
            });
        }
        for user in users {
            entries.push(ActivityEntry {
                id: user.id,
                kind: ActivityKind::UserRegistration,
                description: format!("New user registered: {}", user.name),
                occurred_at: user.created_at,
            });
        }

        entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        entries.truncate(15);
        Ok(entries)
    }
}
