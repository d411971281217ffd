//! Books repository for database operations

use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::AuthorShort,
        book::{Book, BookDetails, BookQuery, BookStats, CreateBook, UpdateBook},
        enums::BookStatus,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Lock the book row for the duration of the surrounding transaction.
    /// Every lifecycle write path takes this lock before its precondition
    /// checks, which serializes claims per book id.
    pub async fn get_for_update_tx(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(book)
    }

    /// Write the cached status projection inside a lifecycle transaction
    pub async fn set_status_tx(
        conn: &mut PgConnection,
        id: i32,
        status: BookStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE books SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Get book with its authors resolved
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.get_by_id(id).await?;
        let mut authors = self.authors_for(&[id]).await?;
        Ok(BookDetails {
            authors: authors.remove(&id).unwrap_or_default(),
            book,
        })
    }

    /// Resolve several books with their authors, preserving input order
    pub async fn get_details_by_ids(&self, ids: &[i32]) -> AppResult<Vec<BookDetails>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(books).await
    }

    /// Search books with optional filters, paginated, newest first
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        let page = query.page.unwrap_or(1).clamp(1, 1_000_000);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let pattern = query.search.as_ref().map(|s| format!("%{}%", s));

        const WHERE: &str = r#"
            ($1::text IS NULL OR b.title ILIKE $1 OR b.description ILIKE $1 OR b.isbn ILIKE $1)
            AND ($2::text IS NULL OR b.category = $2)
            AND ($3::book_status IS NULL OR b.status = $3)
            AND ($4::int IS NULL OR EXISTS(
                SELECT 1 FROM book_authors ba WHERE ba.book_id = b.id AND ba.author_id = $4))
        "#;

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT b.* FROM books b WHERE {WHERE} ORDER BY b.created_at DESC OFFSET $5 LIMIT $6"
        ))
        .bind(pattern.as_deref())
        .bind(query.category.as_deref())
        .bind(query.status)
        .bind(query.author_id)
        .bind((page - 1) * limit)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books b WHERE {WHERE}"))
                .bind(pattern.as_deref())
                .bind(query.category.as_deref())
                .bind(query.status)
                .bind(query.author_id)
                .fetch_one(&self.pool)
                .await?;

        let details = self.hydrate(books).await?;
        Ok((details, total))
    }

    /// Create a book with its author links in one transaction
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, year, isbn, category, description, cover_url, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'available')
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(book.year)
        .bind(book.isbn.as_deref())
        .bind(book.category.as_deref())
        .bind(book.description.as_deref())
        .bind(book.cover_url.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_isbn_conflict)?;

        for author_id in &book.author_ids {
            sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                .bind(created.id)
                .bind(author_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Update book attributes and, when provided, replace its author links
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                year = COALESCE($3, year),
                isbn = COALESCE($4, isbn),
                category = COALESCE($5, category),
                description = COALESCE($6, description),
                cover_url = COALESCE($7, cover_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.year)
        .bind(update.isbn.as_deref())
        .bind(update.category.as_deref())
        .bind(update.description.as_deref())
        .bind(update.cover_url.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_isbn_conflict)?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if let Some(ref author_ids) = update.author_ids {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for author_id in author_ids {
                sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(author_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(book)
    }

    /// Delete a book; fails with a conflict while loans or reservations remain
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let claimed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1)
                OR EXISTS(SELECT 1 FROM reservations WHERE book_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if claimed {
            return Err(AppError::Conflict(
                "Book has loans or reservations on record".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }
        Ok(())
    }

    /// Distinct non-null categories, sorted
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM books WHERE category IS NOT NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Counts of books by status
    pub async fn stats(&self) -> AppResult<BookStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'available') AS available,
                   COUNT(*) FILTER (WHERE status = 'reserved') AS reserved,
                   COUNT(*) FILTER (WHERE status = 'borrowed') AS borrowed
            FROM books
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(BookStats {
            total: row.get("total"),
            available: row.get("available"),
            reserved: row.get("reserved"),
            borrowed: row.get("borrowed"),
        })
    }

    /// Map of book id to its authors
    async fn authors_for(&self, book_ids: &[i32]) -> AppResult<HashMap<i32, Vec<AuthorShort>>> {
        let rows = sqlx::query(
            r#"
            SELECT ba.book_id, a.id, a.name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.name
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<i32, Vec<AuthorShort>> = HashMap::new();
        for row in rows {
            map.entry(row.get("book_id")).or_default().push(AuthorShort {
                id: row.get("id"),
                name: row.get("name"),
            });
        }
        Ok(map)
    }

    async fn hydrate(&self, books: Vec<Book>) -> AppResult<Vec<BookDetails>> {
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
        let mut authors = self.authors_for(&ids).await?;
        Ok(books
            .into_iter()
            .map(|book| BookDetails {
                authors: authors.remove(&book.id).unwrap_or_default(),
                book,
            })
            .collect())
    }
}

/// Surface the ISBN uniqueness constraint as a conflict instead of a raw
/// database error
fn map_isbn_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("A book with this ISBN already exists".to_string())
        }
        _ => AppError::Database(e),
    }
}
