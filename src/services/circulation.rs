//! Borrow lifecycle service
//!
//! The state machine for a loan: PENDING -> BORROWING -> RETURNED, with
//! PENDING -> REJECTED as the refusal path. Inventory is touched only at
//! approval and return, never at request time: many readers may queue
//! requests for a popular title without depleting availability, and staff
//! arbitrate the contention explicitly.

use chrono::{Duration, NaiveDate};
use std::sync::Arc;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{Actor, CopyStatus, Fine, LoanDetails},
    repository::Repository,
    services::audit::{self, AuditEmitter},
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    config: CirculationConfig,
    audit: Arc<dyn AuditEmitter>,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        config: CirculationConfig,
        audit: Arc<dyn AuditEmitter>,
    ) -> Self {
        Self {
            repository,
            config,
            audit,
        }
    }

    /// A reader requests to borrow a specific copy.
    ///
    /// Creates a PENDING loan and nothing else: availability and the copy
    /// status are untouched until staff approve. The due date defaults to
    /// `today` plus the configured loan period when the reader supplies
    /// none; either way it is re-anchored at approval.
    pub async fn request_borrow(
        &self,
        requester: &Actor,
        copy_id: i64,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<LoanDetails> {
        let user = self.repository.users.get_by_id(requester.id).await?;
        let copy = self.repository.copies.get_by_id(copy_id).await?;

        if copy.status != CopyStatus::Available {
            return Err(AppError::InvalidState(
                "This book is currently not available for loan".to_string(),
            ));
        }

        let book = self.repository.books.get_by_id(copy.book_id).await?;

        if self
            .repository
            .loans
            .has_pending_for_book(user.id, book.id)
            .await?
        {
            return Err(AppError::InvalidState(
                "You have already requested to borrow this book, please wait for approval"
                    .to_string(),
            ));
        }

        let due = due_date.unwrap_or(today + Duration::days(self.config.loan_period_days));

        let loan = self
            .repository
            .loans
            .insert_request(
                user.id,
                &user.username,
                copy.id,
                &book.title,
                today,
                due,
                self.config.daily_fine_rate,
            )
            .await?;

        tracing::info!(loan_id = loan.id, user_id = user.id, copy_id, "borrow requested");
        audit::emit(
            self.audit.as_ref(),
            &user,
            format!("Requested to borrow '{}'", book.title),
        )
        .await;

        Ok(LoanDetails::project(loan, today))
    }

    /// Staff approve a pending request.
    ///
    /// The loan period is re-anchored: borrow date becomes today and the
    /// due date becomes today plus the configured period, overriding
    /// whatever the reader asked for. Decrements availability and flips
    /// the copy, atomically with the status change; a concurrent second
    /// approval fails the compare-and-set.
    pub async fn approve(
        &self,
        approver: &Actor,
        loan_id: i64,
        today: NaiveDate,
    ) -> AppResult<LoanDetails> {
        let loan = self
            .repository
            .loans
            .approve(loan_id, today, self.config.loan_period_days)
            .await?;

        tracing::info!(loan_id, approver = %approver.username, "loan approved");
        audit::emit(
            self.audit.as_ref(),
            approver,
            format!("Approved loan of '{}' for {}", loan.book_title, loan.username),
        )
        .await;

        Ok(LoanDetails::project(loan, today))
    }

    /// Staff reject a pending request. No inventory change: none was ever
    /// applied for a pending request.
    pub async fn reject(
        &self,
        rejector: &Actor,
        loan_id: i64,
        today: NaiveDate,
    ) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.reject(loan_id).await?;

        tracing::info!(loan_id, rejector = %rejector.username, "loan rejected");
        audit::emit(
            self.audit.as_ref(),
            rejector,
            format!(
                "Rejected borrow request for '{}' from {}",
                loan.book_title, loan.username
            ),
        )
        .await;

        Ok(LoanDetails::project(loan, today))
    }

    /// Staff process a return.
    ///
    /// Restores availability regardless of how late the return is; when it
    /// is late, the fine is assessed in the same transaction and reported
    /// alongside the closed loan.
    pub async fn return_loan(
        &self,
        staff: &Actor,
        loan_id: i64,
        today: NaiveDate,
    ) -> AppResult<(LoanDetails, Option<Fine>)> {
        let (loan, fine) = self.repository.loans.return_loan(loan_id, today).await?;

        tracing::info!(loan_id, fined = fine.is_some(), "loan returned");
        let action = match &fine {
            Some(fine) => format!(
                "Confirmed return of '{}' by {} (late {} day(s), fined {})",
                loan.book_title, loan.username, fine.late_days, fine.amount
            ),
            None => format!(
                "Confirmed return of '{}' by {}",
                loan.book_title, loan.username
            ),
        };
        audit::emit(self.audit.as_ref(), staff, action).await;

        Ok((LoanDetails::project(loan, today), fine))
    }

    /// Get one loan with its overdue projection
    pub async fn get_loan(&self, loan_id: i64, today: NaiveDate) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        Ok(LoanDetails::project(loan, today))
    }

    /// List all loans
    pub async fn list_loans(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list_all().await?;
        Ok(project_all(loans, today))
    }

    /// List a user's loans
    pub async fn list_user_loans(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        let loans = self.repository.loans.list_by_user(user_id).await?;
        Ok(project_all(loans, today))
    }

    /// List a user's running loans
    pub async fn list_current_loans(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list_current_by_user(user_id).await?;
        Ok(project_all(loans, today))
    }

    /// List requests awaiting approval
    pub async fn list_pending(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list_pending().await?;
        Ok(project_all(loans, today))
    }

    /// List running loans past their due date
    pub async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list_overdue(today).await?;
        Ok(project_all(loans, today))
    }

    /// Count running loans
    pub async fn count_active(&self) -> AppResult<i64> {
        self.repository.loans.count_active().await
    }

    /// Count overdue loans
    pub async fn count_overdue(&self, today: NaiveDate) -> AppResult<i64> {
        self.repository.loans.count_overdue(today).await
    }
}

fn project_all(loans: Vec<crate::models::Loan>, today: NaiveDate) -> Vec<LoanDetails> {
    loans
        .into_iter()
        .map(|loan| LoanDetails::project(loan, today))
        .collect()
}
