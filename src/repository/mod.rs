//! Repository layer for database operations

pub mod activity_logs;
pub mod books;
pub mod copies;
pub mod fines;
pub mod loans;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub fines: fines::FinesRepository,
    pub users: users::UsersRepository,
    pub activity_logs: activity_logs::ActivityLogsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            fines: fines::FinesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            activity_logs: activity_logs::ActivityLogsRepository::new(pool.clone()),
            pool,
        }
    }
}
