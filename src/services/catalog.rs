//! Catalog service: books and authors

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, BookStats, CreateBook, UpdateBook},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // -- Books --------------------------------------------------------------

    /// Search books with filters and pagination
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get a book with its authors
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    /// Create a book after verifying every referenced author exists
    pub async fn create_book(&self, book: CreateBook) -> AppResult<BookDetails> {
        self.verify_authors(&book.author_ids).await?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        self.repository.books.get_details(created.id).await
    }

    /// Update a book; author links are replaced when provided
    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<BookDetails> {
        if let Some(ref author_ids) = update.author_ids {
            self.verify_authors(author_ids).await?;
        }
        let updated: Book = self.repository.books.update(id, &update).await?;
        self.repository.books.get_details(updated.id).await
    }

    /// Delete a book without loan or reservation history
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// Distinct non-null categories
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.books.categories().await
    }

    /// Counts of books by status
    pub async fn book_stats(&self) -> AppResult<BookStats> {
        self.repository.books.stats().await
    }

    async fn verify_authors(&self, author_ids: &[i32]) -> AppResult<()> {
        let found = self.repository.authors.get_by_ids(author_ids).await?;
        if found.len() != author_ids.len() {
            return Err(AppError::Validation(
                "One or more authors not found".to_string(),
            ));
        }
        Ok(())
    }

    // -- Authors ------------------------------------------------------------

    /// List authors with an optional name search
    pub async fn list_authors(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        self.repository.authors.search(query).await
    }

    /// Get author by ID
    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    /// Create a new author
    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        let created = self.repository.authors.create(&author).await?;
        tracing::info!(author_id = created.id, name = %created.name, "Author created");
        Ok(created)
    }

    /// Update an author
    pub async fn update_author(&self, id: i32, update: UpdateAuthor) -> AppResult<Author> {
        self.repository.authors.update(id, &update).await
    }

    /// Delete an author without linked books
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }
}
