//! Loans repository for database operations
//!
//! Each lifecycle transition runs as a single transaction spanning the
//! loan status write and the paired copy/book counter updates. Status
//! writes are compare-and-set (`WHERE status = ...`): when two staff race
//! on the same loan, the loser observes zero affected rows and fails with
//! an invalid-state error instead of double-applying inventory effects.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Fine, FineAssessment, Loan, LoanStatus},
    repository::copies,
};

const LOAN_COLUMNS: &str = "id, user_id, username, copy_id, book_title, \
                            borrow_date, due_date, return_date, status, daily_fine_rate";

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// List all loans, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans ORDER BY id DESC",
            LOAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// List loans of a user, newest first
    pub async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE user_id = $1 ORDER BY id DESC",
            LOAN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// List a user's running loans
    pub async fn list_current_by_user(&self, user_id: i64) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE user_id = $1 AND status = 'BORROWING' ORDER BY due_date",
            LOAN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// List loans awaiting approval, oldest first
    pub async fn list_pending(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE status = 'PENDING' ORDER BY id",
            LOAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// List running loans past their due date.
    ///
    /// This is the same read-time predicate the overdue projection uses;
    /// overdue is never a stored status.
    pub async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE status = 'BORROWING' AND due_date < $1 ORDER BY due_date",
            LOAN_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Does the user already have a pending request for this book
    /// (any of its copies)?
    pub async fn has_pending_for_book(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans l \
             JOIN book_copies c ON l.copy_id = c.id \
             WHERE l.user_id = $1 AND c.book_id = $2 AND l.status = 'PENDING')",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a new PENDING request. No inventory mutation happens here:
    /// pending requests do not hold the copy.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_request(
        &self,
        user_id: i64,
        username: &str,
        copy_id: i64,
        book_title: &str,
        request_date: NaiveDate,
        due_date: NaiveDate,
        daily_fine_rate: Decimal,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "INSERT INTO loans (user_id, username, copy_id, book_title, \
             borrow_date, due_date, status, daily_fine_rate) \
             VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7) RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(user_id)
        .bind(username)
        .bind(copy_id)
        .bind(book_title)
        .bind(request_date)
        .bind(due_date)
        .bind(daily_fine_rate)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Approve a pending request: PENDING -> BORROWING.
    ///
    /// Re-anchors the loan period at the approval date (possession, not
    /// request submission, starts the clock) and applies the paired
    /// copy flip and counter decrement in the same transaction.
    pub async fn approve(
        &self,
        loan_id: i64,
        today: NaiveDate,
        loan_period_days: i64,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1",
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.status != LoanStatus::Pending {
            return Err(AppError::InvalidState(
                "This request has already been processed".to_string(),
            ));
        }

        let copy_id = loan.copy_id.ok_or_else(|| {
            AppError::NotFound("The requested copy no longer exists".to_string())
        })?;

        copies::mark_borrowed(&mut tx, copy_id).await?;

        let due_date = today + Duration::days(loan_period_days);

        let approved = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'BORROWING', borrow_date = $1, due_date = $2 \
             WHERE id = $3 AND status = 'PENDING' RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(today)
        .bind(due_date)
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState("This request has already been processed".to_string())
        })?;

        tx.commit().await?;
        Ok(approved)
    }

    /// Reject a pending request: PENDING -> REJECTED. No inventory change,
    /// none was ever applied for a pending request.
    pub async fn reject(&self, loan_id: i64) -> AppResult<Loan> {
        // Existence check first so an absent loan is NotFound, not a
        // guard failure.
        self.get_by_id(loan_id).await?;

        sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'REJECTED' \
             WHERE id = $1 AND status = 'PENDING' RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState("This request has already been processed".to_string())
        })
    }

    /// Close a running loan: BORROWING -> RETURNED.
    ///
    /// Flips the copy back, increments availability and, when the return
    /// is late, creates the fine — all in one transaction. The fine amount
    /// is the loan's captured daily rate times the whole days past due.
    pub async fn return_loan(
        &self,
        loan_id: i64,
        today: NaiveDate,
    ) -> AppResult<(Loan, Option<Fine>)> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1",
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.status != LoanStatus::Borrowing {
            return Err(AppError::InvalidState(
                "This book is either not borrowed or has already been returned".to_string(),
            ));
        }

        let copy_id = loan
            .copy_id
            .ok_or_else(|| AppError::NotFound("The borrowed copy no longer exists".to_string()))?;

        let returned = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'RETURNED', return_date = $1 \
             WHERE id = $2 AND status = 'BORROWING' RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(today)
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState("This loan has already been returned".to_string())
        })?;

        copies::mark_available(&mut tx, copy_id).await?;

        let fine = match FineAssessment::for_return(loan.daily_fine_rate, loan.due_date, today) {
            Some(assessment) => {
                let fine = sqlx::query_as::<_, Fine>(
                    "INSERT INTO fines (loan_id, amount, status, issued_date, late_days, reason) \
                     VALUES ($1, $2, 'PENDING', $3, $4, $5) \
                     RETURNING id, loan_id, amount, status, issued_date, late_days, reason",
                )
                .bind(loan_id)
                .bind(assessment.amount)
                .bind(today)
                .bind(assessment.late_days as i32)
                .bind(&assessment.reason)
                .fetch_one(&mut *tx)
                .await?;

                Some(fine)
            }
            None => None,
        };

        tx.commit().await?;
        Ok((returned, fine))
    }

    /// Count running loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status = 'BORROWING'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count running loans past their due date
    pub async fn count_overdue(&self, today: NaiveDate) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'BORROWING' AND due_date < $1",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
