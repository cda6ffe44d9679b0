//! Book copies repository
//!
//! The copy status flag is the single source of truth the book counters
//! track. Every status flip here is paired with the matching counter delta
//! on the owning book inside the caller's transaction; there is no path
//! that applies one without the other.

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{BookCopy, CopyStatus},
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(
            "SELECT id, book_id, branch_id, status FROM book_copies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book copy with id {} not found", id)))
    }

    /// List copies of a book
    pub async fn list_by_book(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT id, book_id, branch_id, status FROM book_copies WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    /// List the available copies of a book
    pub async fn list_available(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT id, book_id, branch_id, status FROM book_copies \
             WHERE book_id = $1 AND status = 'AVAILABLE' ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    /// Add `n` available copies of a book under the default branch,
    /// incrementing both book counters in the same transaction.
    pub async fn add_copies(&self, book_id: i64, n: i32) -> AppResult<()> {
        if n <= 0 {
            return Err(AppError::InvalidState(
                "Number of copies to add must be positive".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                book_id
            )));
        }

        let branch_id = default_branch_id(&mut tx).await?;

        sqlx::query(
            "INSERT INTO book_copies (book_id, branch_id, status) \
             SELECT $1, $2, 'AVAILABLE' FROM generate_series(1, $3)",
        )
        .bind(book_id)
        .bind(branch_id)
        .bind(n)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE books SET total_quantity = total_quantity + $1, \
             available_quantity = available_quantity + $1 WHERE id = $2",
        )
        .bind(n)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a copy that is not out on loan, decrementing the book's
    /// total (and available, when the copy was available) in the same
    /// transaction.
    pub async fn remove(&self, copy_id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let copy = sqlx::query_as::<_, BookCopy>(
            "SELECT id, book_id, branch_id, status FROM book_copies WHERE id = $1",
        )
        .bind(copy_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book copy with id {} not found", copy_id)))?;

        if copy.status == CopyStatus::Borrowed {
            return Err(AppError::InvalidState(
                "Cannot remove a borrowed book copy".to_string(),
            ));
        }

        // Historical loans keep their snapshots; the reference goes weak.
        sqlx::query("UPDATE loans SET copy_id = NULL WHERE copy_id = $1")
            .bind(copy_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM book_copies WHERE id = $1")
            .bind(copy_id)
            .execute(&mut *tx)
            .await?;

        if copy.status == CopyStatus::Available {
            sqlx::query(
                "UPDATE books SET total_quantity = total_quantity - 1, \
                 available_quantity = available_quantity - 1 WHERE id = $1",
            )
            .bind(copy.book_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("UPDATE books SET total_quantity = total_quantity - 1 WHERE id = $1")
                .bind(copy.book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Resolve the default branch hosting new stock. No branch at all is a
/// fatal precondition for stock creation.
pub(crate) async fn default_branch_id(conn: &mut PgConnection) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM branches ORDER BY id LIMIT 1")
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            AppError::Precondition("No branch found. Please create a branch first.".to_string())
        })
}

/// Flip a copy AVAILABLE -> BORROWED and decrement the owning book's
/// available counter, both on the caller's open transaction. The flip is a
/// compare-and-set: a copy that is not AVAILABLE fails the guard, which is
/// what serializes racing approvals.
///
/// Returns the owning book id.
pub(crate) async fn mark_borrowed(conn: &mut PgConnection, copy_id: i64) -> AppResult<i64> {
    let book_id = sqlx::query_scalar::<_, i64>(
        "UPDATE book_copies SET status = 'BORROWED' \
         WHERE id = $1 AND status = 'AVAILABLE' RETURNING book_id",
    )
    .bind(copy_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        AppError::InvalidState("This book copy is currently unavailable".to_string())
    })?;

    let updated = sqlx::query(
        "UPDATE books SET available_quantity = available_quantity - 1 \
         WHERE id = $1 AND available_quantity > 0",
    )
    .bind(book_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::InvalidState(
            "Book has no available copies recorded".to_string(),
        ));
    }

    Ok(book_id)
}

/// Flip a copy BORROWED -> AVAILABLE and increment the owning book's
/// available counter, both on the caller's open transaction.
///
/// Returns the owning book id.
pub(crate) async fn mark_available(conn: &mut PgConnection, copy_id: i64) -> AppResult<i64> {
    let book_id = sqlx::query_scalar::<_, i64>(
        "UPDATE book_copies SET status = 'AVAILABLE' \
         WHERE id = $1 AND status = 'BORROWED' RETURNING book_id",
    )
    .bind(copy_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::InvalidState("This book copy is not out on loan".to_string()))?;

    sqlx::query("UPDATE books SET available_quantity = available_quantity + 1 WHERE id = $1")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    Ok(book_id)
}
