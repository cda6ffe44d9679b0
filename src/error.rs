//! Error types for the Libris circulation engine

use thiserror::Error;

/// Main application error type
///
/// Every variant is caller-correctable: there are no transient failure
/// modes inside the engine, so callers re-fetch current state before
/// retrying rather than retry blindly.
#[derive(Error, Debug)]
pub enum AppError {
    /// A referenced user, book, copy, loan, fine or branch does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lifecycle guard failed: wrong loan status, copy unavailable,
    /// duplicate pending request, fine already settled, or a concurrent
    /// caller won the transition race.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A fatal precondition for the operation is missing, e.g. no branch
    /// exists to host newly created stock.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
