//! User management and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::UserRole,
        user::{RegisterUser, UpdateUser, User, UserClaims, UserPublic},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new reader account
    pub async fn register(&self, request: RegisterUser) -> AppResult<UserPublic> {
        if self
            .repository
            .users
            .get_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.name, &request.email, &password_hash, UserRole::User)
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user.into())
    }

    /// Authenticate by email and password, returning a JWT and the user
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, UserPublic)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.create_token(&user)?;
        Ok((token, user.into()))
    }

    /// Issue a JWT for the given user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            iat: now,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
        };
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Get user by ID (public view)
    pub async fn get(&self, id: i32) -> AppResult<UserPublic> {
        Ok(self.repository.users.get_by_id(id).await?.into())
    }

    /// List users, paginated
    pub async fn list(&self, page: i64, limit: i64) -> AppResult<(Vec<UserPublic>, i64)> {
        let page = page.clamp(1, 1_000_000);
        let limit = limit.clamp(1, 100);
        self.repository.users.list(page, limit).await
    }

    /// Update a user profile (role changes are gated in the handler)
    pub async fn update(&self, id: i32, update: UpdateUser) -> AppResult<UserPublic> {
        if let Some(ref email) = update.email {
            if let Some(other) = self.repository.users.get_by_email(email).await? {
                if other.id != id {
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
            }
        }
        Ok(self.repository.users.update(id, &update).await?.into())
    }

    /// Delete a user account
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
