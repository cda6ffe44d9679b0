//! Book model with denormalized copy counters

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Book record from database
///
/// `total_quantity` and `available_quantity` are maintained as aggregates
/// over the book's copies rather than recomputed per read. Every copy
/// status flip or copy creation/deletion applies the matching counter
/// delta in the same transaction; `0 <= available <= total` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
}
