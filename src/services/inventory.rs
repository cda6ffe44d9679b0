//! Inventory ledger service
//!
//! Stock management for books and their physical copies. Counter deltas
//! and copy changes are paired inside the repository transactions; this
//! service adds the guards, lookups and audit trail.

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Actor, Book, BookCopy},
    repository::Repository,
    services::audit::{self, AuditEmitter},
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
    audit: Arc<dyn AuditEmitter>,
}

impl InventoryService {
    pub fn new(repository: Repository, audit: Arc<dyn AuditEmitter>) -> Self {
        Self { repository, audit }
    }

    /// Add a new book with an initial number of copies under the default
    /// branch
    pub async fn create_book(
        &self,
        actor: &Actor,
        title: &str,
        quantity: i32,
    ) -> AppResult<Book> {
        let book = self.repository.books.create(title, quantity).await?;

        tracing::info!(book_id = book.id, quantity, "book created");
        audit::emit(
            self.audit.as_ref(),
            actor,
            format!("Added new book: '{}'", book.title),
        )
        .await;

        Ok(book)
    }

    /// Add stock: `n` new available copies of an existing book
    pub async fn add_copies(&self, actor: &Actor, book_id: i64, n: i32) -> AppResult<Book> {
        self.repository.copies.add_copies(book_id, n).await?;
        let book = self.repository.books.get_by_id(book_id).await?;

        tracing::info!(book_id, n, "copies added");
        audit::emit(
            self.audit.as_ref(),
            actor,
            format!("Added {} cop(ies) of '{}'", n, book.title),
        )
        .await;

        Ok(book)
    }

    /// Remove a copy that is not out on loan
    pub async fn remove_copy(&self, actor: &Actor, copy_id: i64) -> AppResult<()> {
        let copy = self.repository.copies.get_by_id(copy_id).await?;
        let book = self.repository.books.get_by_id(copy.book_id).await?;

        self.repository.copies.remove(copy_id).await?;

        tracing::info!(copy_id, book_id = book.id, "copy removed");
        audit::emit(
            self.audit.as_ref(),
            actor,
            format!("Removed a copy of '{}'", book.title),
        )
        .await;

        Ok(())
    }

    /// Delete a book and its copies; refused while any copy is pending or
    /// out on loan
    pub async fn delete_book(&self, actor: &Actor, book_id: i64) -> AppResult<()> {
        let title = self.repository.books.delete(book_id).await?;

        tracing::info!(book_id, "book deleted");
        audit::emit(
            self.audit.as_ref(),
            actor,
            format!("Deleted book: '{}'", title),
        )
        .await;

        Ok(())
    }

    /// Get book by ID
    pub async fn get_book(&self, book_id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(book_id).await
    }

    /// List all books
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// List books with available copies
    pub async fn list_available_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_available().await
    }

    /// Get copy by ID
    pub async fn get_copy(&self, copy_id: i64) -> AppResult<BookCopy> {
        self.repository.copies.get_by_id(copy_id).await
    }

    /// List a book's copies
    pub async fn list_copies(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.copies.list_by_book(book_id).await
    }

    /// List a book's available copies
    pub async fn list_available_copies(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.copies.list_available(book_id).await
    }
}
