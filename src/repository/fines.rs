//! Fines repository
//!
//! A fine settles exactly once: PENDING -> PAID or PENDING -> WAIVED,
//! enforced with compare-and-set updates.

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::Fine,
};

const FINE_COLUMNS: &str = "id, loan_id, amount, status, issued_date, late_days, reason";

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get fine by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>(&format!("SELECT {} FROM fines WHERE id = $1", FINE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    /// List all fines, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(&format!(
            "SELECT {} FROM fines ORDER BY id DESC",
            FINE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }

    /// List all unsettled fines
    pub async fn list_pending(&self) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(&format!(
            "SELECT {} FROM fines WHERE status = 'PENDING' ORDER BY id DESC",
            FINE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }

    /// List fines across all of a user's loans
    pub async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(&format!(
            "SELECT f.{} FROM fines f \
             JOIN loans l ON f.loan_id = l.id WHERE l.user_id = $1 ORDER BY f.id DESC",
            FINE_COLUMNS.replace(", ", ", f.")
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }

    /// List a user's unsettled fines
    pub async fn list_pending_by_user(&self, user_id: i64) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(&format!(
            "SELECT f.{} FROM fines f \
             JOIN loans l ON f.loan_id = l.id \
             WHERE l.user_id = $1 AND f.status = 'PENDING' ORDER BY f.id DESC",
            FINE_COLUMNS.replace(", ", ", f.")
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }

    /// Sum of a user's unsettled fine amounts. Zero, never absent.
    pub async fn total_pending(&self, user_id: i64) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(f.amount), 0) FROM fines f \
             JOIN loans l ON f.loan_id = l.id \
             WHERE l.user_id = $1 AND f.status = 'PENDING'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Settle a fine as paid: PENDING -> PAID
    pub async fn pay(&self, fine_id: i64) -> AppResult<Fine> {
        self.get_by_id(fine_id).await?;

        sqlx::query_as::<_, Fine>(&format!(
            "UPDATE fines SET status = 'PAID' \
             WHERE id = $1 AND status = 'PENDING' RETURNING {}",
            FINE_COLUMNS
        ))
        .bind(fine_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState("This fine has already been processed".to_string())
        })
    }

    /// Settle a fine as waived: PENDING -> WAIVED.
    ///
    /// The supplied reason is appended to the stored one so the late-day
    /// narrative from assessment is preserved.
    pub async fn waive(&self, fine_id: i64, reason: &str) -> AppResult<Fine> {
        self.get_by_id(fine_id).await?;

        sqlx::query_as::<_, Fine>(&format!(
            "UPDATE fines SET status = 'WAIVED', reason = reason || ' | Waived: ' || $2 \
             WHERE id = $1 AND status = 'PENDING' RETURNING {}",
            FINE_COLUMNS
        ))
        .bind(fine_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState("This fine has already been processed".to_string())
        })
    }
}
