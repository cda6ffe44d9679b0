//! Books repository
//!
//! Owns the denormalized `total_quantity`/`available_quantity` counters.
//! Counter mutations never happen here in isolation; they ride the same
//! transaction as the copy change that justifies them.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::Book,
    repository::copies,
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
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, title, total_quantity, available_quantity FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List all books
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, total_quantity, available_quantity FROM books ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// List books with at least one available copy
    pub async fn list_available(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, total_quantity, available_quantity FROM books \
             WHERE available_quantity > 0 ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Create a book with `quantity` available copies under the default
    /// branch, in one transaction.
    pub async fn create(&self, title: &str, quantity: i32) -> AppResult<Book> {
        if quantity < 0 {
            return Err(AppError::InvalidState(
                "Initial quantity cannot be negative".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, total_quantity, available_quantity) \
             VALUES ($1, $2, $2) RETURNING id, title, total_quantity, available_quantity",
        )
        .bind(title)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        if quantity > 0 {
            let branch_id = copies::default_branch_id(&mut tx).await?;

            sqlx::query(
                "INSERT INTO book_copies (book_id, branch_id, status) \
                 SELECT $1, $2, 'AVAILABLE' FROM generate_series(1, $3)",
            )
            .bind(book.id)
            .bind(branch_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(book)
    }

    /// Delete a book and its copies.
    ///
    /// Refused while any copy has a pending or running loan. Historical
    /// loans survive with their snapshots, the copy references go weak.
    ///
    /// Returns the deleted book's title for audit text.
    pub async fn delete(&self, id: i64) -> AppResult<String> {
        let mut tx = self.pool.begin().await?;

        let title = sqlx::query_scalar::<_, String>("SELECT title FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans l \
             JOIN book_copies c ON l.copy_id = c.id \
             WHERE c.book_id = $1 AND l.status IN ('PENDING', 'BORROWING')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::InvalidState(format!(
                "Cannot delete this book: {} cop(ies) are on loan or awaiting approval",
                active
            )));
        }

        sqlx::query(
            "UPDATE loans SET copy_id = NULL \
             WHERE copy_id IN (SELECT id FROM book_copies WHERE book_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM book_copies WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(title)
    }
}
