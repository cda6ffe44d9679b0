//! Users repository
//!
//! Identity lives in an external provider; this repository only resolves
//! user rows so lifecycle guards can fail with NotFound and snapshots can
//! be captured from the stored username.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::Actor,
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Actor> {
        sqlx::query_as::<_, Actor>("SELECT id, username, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}
