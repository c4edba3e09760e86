//! Book operations

use library_core::ports::Repository;
use library_core::{BackendKind, Book, BookDraft, Result};
use std::sync::Arc;
use uuid::Uuid;

pub struct BookService {
    repo: Arc<dyn Repository>,
}

impl BookService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub fn backend(&self) -> BackendKind {
        self.repo.backend()
    }

    pub async fn get_books(&self) -> Result<Vec<Book>> {
        self.repo.list_books().await
    }

    pub async fn get_book(&self, id: &str) -> Result<Book> {
        self.repo.get_book(id).await
    }

    pub async fn add_book(&self, draft: BookDraft) -> Result<Uuid> {
        self.repo.save_book(draft).await
    }

    pub async fn edit_book(&self, id: &str, draft: BookDraft) -> Result<()> {
        self.repo.edit_book(id, draft).await
    }

    /// Soft delete; the row is removed by the next purge
    pub async fn delete_book(&self, id: &str) -> Result<()> {
        self.repo.delete_book(id).await
    }

    /// Purge every soft-deleted book
    pub async fn delete_books(&self) -> Result<u64> {
        self.repo.purge_deleted_books().await
    }
}
