//! Business logic services

pub mod catalog;
pub mod lifecycle;
pub mod loans;
pub mod reservations;
pub mod stats;
pub mod users;

use crate::{
    config::{AuthConfig, LifecycleConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub stats: stats::StatsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        lifecycle_config: LifecycleConfig,
    ) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), lifecycle_config),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                lifecycle_config,
            ),
            stats: stats::StatsService::new(repository.clone()),
            repository,
        }
    }

    /// Database pool, used by the readiness probe
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.repository.pool
    }
}
