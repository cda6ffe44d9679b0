//! Activity log repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::ActivityLog};

#[derive(Clone)]
pub struct ActivityLogsRepository {
    pool: Pool<Postgres>,
}

impl ActivityLogsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append one audit entry. The username/role snapshots survive user
    /// deletion, the user_id reference goes weak with it.
    pub async fn insert(
        &self,
        user_id: Option<i64>,
        username: &str,
        user_role: &str,
        action: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO activity_logs (user_id, username, user_role, action) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(username)
        .bind(user_role)
        .bind(action)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List entries, most recent first
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<ActivityLog>> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            "SELECT id, user_id, username, user_role, action, timestamp \
             FROM activity_logs ORDER BY timestamp DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
