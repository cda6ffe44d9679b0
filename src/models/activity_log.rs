//! Activity log (audit trail) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One audited action.
///
/// `user_id` is a weak reference (nulled when the user is deleted); the
/// `username` and `user_role` snapshots keep the entry readable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub user_role: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}
