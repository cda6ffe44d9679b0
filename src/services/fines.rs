//! Fine settlement service
//!
//! Fines are created by the return path of the borrow lifecycle; this
//! service manages their settle/waive lifecycle and the per-user totals.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Actor, Fine},
    repository::Repository,
    services::audit::{self, AuditEmitter},
};

#[derive(Clone)]
pub struct FinesService {
    repository: Repository,
    audit: Arc<dyn AuditEmitter>,
}

impl FinesService {
    pub fn new(repository: Repository, audit: Arc<dyn AuditEmitter>) -> Self {
        Self { repository, audit }
    }

    /// Staff confirm payment of a pending fine
    pub async fn pay(&self, staff: &Actor, fine_id: i64) -> AppResult<Fine> {
        let fine = self.repository.fines.pay(fine_id).await?;

        // Snapshots on the owning loan keep the audit text legible even
        // after the user or copy is gone.
        let loan = self.repository.loans.get_by_id(fine.loan_id).await?;

        tracing::info!(fine_id, amount = %fine.amount, "fine paid");
        audit::emit(
            self.audit.as_ref(),
            staff,
            format!(
                "Confirmed payment of fine {} from {} (book: '{}')",
                fine.amount, loan.username, loan.book_title
            ),
        )
        .await;

        Ok(fine)
    }

    /// Staff waive a pending fine, appending their reason to the stored
    /// assessment narrative
    pub async fn waive(&self, staff: &Actor, fine_id: i64, reason: &str) -> AppResult<Fine> {
        let fine = self.repository.fines.waive(fine_id, reason).await?;

        let loan = self.repository.loans.get_by_id(fine.loan_id).await?;

        tracing::info!(fine_id, amount = %fine.amount, "fine waived");
        audit::emit(
            self.audit.as_ref(),
            staff,
            format!(
                "Waived fine {} for {} (book: '{}', reason: {})",
                fine.amount, loan.username, loan.book_title, reason
            ),
        )
        .await;

        Ok(fine)
    }

    /// Sum of the user's pending fine amounts; zero when there are none.
    pub async fn total_pending(&self, user_id: i64) -> AppResult<Decimal> {
        self.repository.fines.total_pending(user_id).await
    }

    /// Get fine by ID
    pub async fn get_fine(&self, fine_id: i64) -> AppResult<Fine> {
        self.repository.fines.get_by_id(fine_id).await
    }

    /// List all fines
    pub async fn list_fines(&self) -> AppResult<Vec<Fine>> {
        self.repository.fines.list_all().await
    }

    /// List all unsettled fines
    pub async fn list_pending(&self) -> AppResult<Vec<Fine>> {
        self.repository.fines.list_pending().await
    }

    /// List a user's fines
    pub async fn list_user_fines(&self, user_id: i64) -> AppResult<Vec<Fine>> {
        self.repository.fines.list_by_user(user_id).await
    }

    /// List a user's unsettled fines
    pub async fn list_user_pending(&self, user_id: i64) -> AppResult<Vec<Fine>> {
        self.repository.fines.list_pending_by_user(user_id).await
    }
}
