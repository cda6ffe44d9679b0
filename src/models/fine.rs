//! Fine model and late-return assessment

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Fine settlement states. PENDING settles exactly once, to PAID or WAIVED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fine_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FineStatus {
    Pending,
    Paid,
    Waived,
}

impl fmt::Display for FineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FineStatus::Pending => write!(f, "PENDING"),
            FineStatus::Paid => write!(f, "PAID"),
            FineStatus::Waived => write!(f, "WAIVED"),
        }
    }
}

/// A monetary penalty tied to exactly one late-returned loan
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Fine {
    pub id: i64,
    pub loan_id: i64,
    pub amount: Decimal,
    pub status: FineStatus,
    pub issued_date: NaiveDate,
    pub late_days: i32,
    pub reason: String,
}

/// Outcome of assessing a return against its due date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineAssessment {
    pub late_days: i64,
    pub amount: Decimal,
    pub reason: String,
}

impl FineAssessment {
    /// Assess a return. Returns `None` when the loan came back on time;
    /// the due date itself is not late.
    pub fn for_return(daily_rate: Decimal, due_date: NaiveDate, returned: NaiveDate) -> Option<Self> {
        if returned <= due_date {
            return None;
        }
        let late_days = (returned - due_date).num_days();
        Some(Self {
            late_days,
            amount: daily_rate * Decimal::from(late_days),
            reason: format!("Returned {} day(s) late", late_days),
        })
    }
}
