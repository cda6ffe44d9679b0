//! Data models for the Libris engine

pub mod activity_log;
pub mod actor;
pub mod book;
pub mod copy;
pub mod fine;
pub mod loan;

// Re-export commonly used types
pub use activity_log::ActivityLog;
pub use actor::Actor;
pub use book::Book;
pub use copy::{BookCopy, CopyStatus};
pub use fine::{Fine, FineAssessment, FineStatus};
pub use loan::{Loan, LoanDetails, LoanStatus};
