//! Actor identity handed in by the external identity provider

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An authenticated user or staff member performing an operation.
///
/// The engine trusts the id and the role label as supplied; authentication
/// and authorization happen in the embedding layer. The username and role
/// are used verbatim in audit text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: i64, username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            role: role.into(),
        }
    }
}
