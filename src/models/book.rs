//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::AuthorShort;
use super::enums::BookStatus;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
}

/// Book with its authors resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<AuthorShort>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(range(min = -3000, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(min = 10, max = 20))]
    pub isbn: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub cover_url: Option<String>,
    #[validate(length(min = 1))]
    pub author_ids: Vec<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(range(min = -3000, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(min = 10, max = 20))]
    pub isbn: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub cover_url: Option<String>,
    pub author_ids: Option<Vec<i32>>,
}

/// Query parameters for listing books
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Substring match on title, description or ISBN
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<BookStatus>,
    pub author_id: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Counts of books by status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookStats {
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
    pub borrowed: i64,
}
