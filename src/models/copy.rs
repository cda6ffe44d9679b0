//! Book copy (physical unit) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Availability status of a single physical copy.
///
/// A BORROWED copy has exactly one loan in the BORROWING state referencing
/// it; an AVAILABLE copy has none. PENDING requests do not hold the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "copy_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CopyStatus {
    Available,
    Borrowed,
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyStatus::Available => write!(f, "AVAILABLE"),
            CopyStatus::Borrowed => write!(f, "BORROWED"),
        }
    }
}

/// A physical copy of a book, owned by exactly one branch
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookCopy {
    pub id: i64,
    pub book_id: i64,
    pub branch_id: i64,
    pub status: CopyStatus,
}
