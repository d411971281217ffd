//! Author model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub bio: Option<String>,
    pub birth_year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Compact author view embedded in book responses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorShort {
    pub id: i32,
    pub name: String,
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub bio: Option<String>,
    #[validate(range(min = -3000, max = 2100))]
    pub birth_year: Option<i32>,
}

/// Update author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub bio: Option<String>,
    #[validate(range(min = -3000, max = 2100))]
    pub birth_year: Option<i32>,
}

/// Query parameters for listing authors
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthorQuery {
    /// Substring match on the author name
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
