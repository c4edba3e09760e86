//! Storage traits for persistence
//!
//! Both backends honour the same contract: identifiers are generated on save,
//! uniqueness is checked against live rows only, and every failure is
//! returned to the caller untouched.

use crate::Result;
use async_trait::async_trait;
use library_types::{BackendKind, Book, BookDraft, User, UserDraft, UserLogin};
use uuid::Uuid;

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users; `EmptyCollection` when there are none
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: &str) -> Result<User>;

    /// Hash the password, check email uniqueness and insert under a new id
    async fn save_user(&self, draft: UserDraft) -> Result<Uuid>;

    /// Replace name, email, age and (when it no longer verifies) password.
    /// The id and registration date are preserved.
    async fn edit_user(&self, id: &str, draft: UserDraft) -> Result<()>;

    async fn delete_user(&self, id: &str) -> Result<()>;

    /// Resolve a login to a user id. Unknown email and wrong password both
    /// fail with `InvalidCredential`.
    async fn validate_credentials(&self, login: &UserLogin) -> Result<Uuid>;
}

/// Book store
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All live books; `EmptyCollection` when there are none
    async fn list_books(&self) -> Result<Vec<Book>>;

    /// A live book; soft-deleted rows report `NotFound`
    async fn get_book(&self, id: &str) -> Result<Book>;

    async fn save_book(&self, draft: BookDraft) -> Result<Uuid>;

    async fn edit_book(&self, id: &str, draft: BookDraft) -> Result<()>;

    /// Soft delete. A book that is already marked reports `NotFound`.
    async fn delete_book(&self, id: &str) -> Result<()>;

    /// Physically remove every soft-deleted book, all or nothing.
    /// Returns the number of rows removed.
    async fn purge_deleted_books(&self) -> Result<u64>;
}

/// The full repository contract a backend provides
pub trait Repository: UserStore + BookStore {
    fn backend(&self) -> BackendKind;
}
