//! Loan (borrow record) model and read projections

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Persisted loan states.
///
/// OVERDUE is deliberately not among them: it is a read-time projection of
/// BORROWING (see [`Loan::is_overdue`]), so a stored flag can never drift
/// from the computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "loan_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Pending,
    Borrowing,
    Returned,
    Rejected,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Pending => write!(f, "PENDING"),
            LoanStatus::Borrowing => write!(f, "BORROWING"),
            LoanStatus::Returned => write!(f, "RETURNED"),
            LoanStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Loan record from database
///
/// `user_id` and `copy_id` are weak references: they are nulled when the
/// user or copy is deleted, while the `username` and `book_title` snapshots
/// captured at request time keep the history legible. A loan is never
/// deleted; it is the historical record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub copy_id: Option<i64>,
    pub book_title: String,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub daily_fine_rate: Decimal,
}

impl Loan {
    /// Read-time overdue projection: an open BORROWING loan past its due
    /// date. The due date itself is not overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == LoanStatus::Borrowing && self.return_date.is_none() && today > self.due_date
    }

    /// Whole days past the due date, 0 when not overdue.
    pub fn overdue_days(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }
}

/// Loan with the overdue projection computed for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub is_overdue: bool,
    pub overdue_days: i64,
}

impl LoanDetails {
    /// Project a stored loan against the caller-supplied date.
    pub fn project(loan: Loan, today: NaiveDate) -> Self {
        let is_overdue = loan.is_overdue(today);
        let overdue_days = loan.overdue_days(today);
        Self {
            loan,
            is_overdue,
            overdue_days,
        }
    }
}
