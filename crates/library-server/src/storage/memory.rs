//! In-memory repository (fallback when PostgreSQL is unreachable)
//!
//! Both tables live behind one `RwLock`. Reads share it; every mutation holds
//! it exclusively for the whole check-then-write, so uniqueness checks and
//! purges are atomic with respect to every other caller.

use async_trait::async_trait;
use library_core::credentials::{hash_password, verify_dummy, verify_password};
use library_core::ports::{BookStore, Repository, UserStore};
use library_core::{
    parse_id, BackendKind, Book, BookDraft, Entity, LibraryError, Result, User, UserDraft,
    UserLogin,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    books: BTreeMap<Uuid, Book>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn title_taken(&self, name: &str, author: &str, except: Option<Uuid>) -> bool {
        self.books
            .values()
            .any(|b| b.same_title(name, author) && Some(b.id) != except)
    }

    fn live_book_mut(&mut self, id: &Uuid) -> Result<&mut Book> {
        self.books
            .get_mut(id)
            .filter(|b| !b.deleted)
            .ok_or(LibraryError::NotFound(Entity::Book))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        if tables.users.is_empty() {
            return Err(LibraryError::EmptyCollection(Entity::User));
        }
        Ok(tables.users.values().cloned().collect())
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let id = parse_id(id)?;
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(LibraryError::NotFound(Entity::User))
    }

    async fn save_user(&self, draft: UserDraft) -> Result<Uuid> {
        // Cheap pre-check so duplicates don't pay for a hash
        if self.tables.read().await.email_taken(&draft.email, None) {
            return Err(LibraryError::AlreadyExists(Entity::User));
        }

        let password = hash_password(&draft.password)?;

        let mut tables = self.tables.write().await;
        if tables.email_taken(&draft.email, None) {
            return Err(LibraryError::AlreadyExists(Entity::User));
        }

        let id = Uuid::new_v4();
        tables.users.insert(
            id,
            User {
                id,
                name: draft.name,
                password,
                email: draft.email,
                age: draft.age,
                date_registration: chrono::Utc::now(),
            },
        );
        debug!(user_id = %id, users = tables.users.len(), "user saved in memory");

        Ok(id)
    }

    async fn edit_user(&self, id: &str, draft: UserDraft) -> Result<()> {
        let id = parse_id(id)?;

        loop {
            let stored_hash = {
                let tables = self.tables.read().await;
                let user = tables
                    .users
                    .get(&id)
                    .ok_or(LibraryError::NotFound(Entity::User))?;
                if tables.email_taken(&draft.email, Some(id)) {
                    return Err(LibraryError::AlreadyExists(Entity::User));
                }
                user.password.clone()
            };

            // Argon2 runs with no lock held
            let password = if verify_password(&stored_hash, &draft.password)? {
                stored_hash.clone()
            } else {
                hash_password(&draft.password)?
            };

            let mut tables = self.tables.write().await;
            if tables.email_taken(&draft.email, Some(id)) {
                return Err(LibraryError::AlreadyExists(Entity::User));
            }
            let user = tables
                .users
                .get_mut(&id)
                .ok_or(LibraryError::NotFound(Entity::User))?;

            // A concurrent edit replaced the password; decide again against it
            if user.password != stored_hash {
                debug!(user_id = %id, "password changed during edit, retrying");
                continue;
            }

            user.name = draft.name;
            user.email = draft.email;
            user.age = draft.age;
            user.password = password;
            return Ok(());
        }
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        self.tables
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(LibraryError::NotFound(Entity::User))
    }

    async fn validate_credentials(&self, login: &UserLogin) -> Result<Uuid> {
        let found = self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == login.email)
            .map(|u| (u.id, u.password.clone()));

        match found {
            Some((id, hash)) => {
                if verify_password(&hash, &login.password)? {
                    Ok(id)
                } else {
                    Err(LibraryError::InvalidCredential)
                }
            }
            None => {
                verify_dummy(&login.password);
                Err(LibraryError::InvalidCredential)
            }
        }
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_books(&self) -> Result<Vec<Book>> {
        let books: Vec<Book> = self
            .tables
            .read()
            .await
            .books
            .values()
            .filter(|b| !b.deleted)
            .cloned()
            .collect();

        if books.is_empty() {
            return Err(LibraryError::EmptyCollection(Entity::Book));
        }
        Ok(books)
    }

    async fn get_book(&self, id: &str) -> Result<Book> {
        let id = parse_id(id)?;
        self.tables
            .read()
            .await
            .books
            .get(&id)
            .filter(|b| !b.deleted)
            .cloned()
            .ok_or(LibraryError::NotFound(Entity::Book))
    }

    async fn save_book(&self, draft: BookDraft) -> Result<Uuid> {
        let mut tables = self.tables.write().await;
        if tables.title_taken(&draft.name, &draft.author, None) {
            return Err(LibraryError::AlreadyExists(Entity::Book));
        }

        let id = Uuid::new_v4();
        tables.books.insert(id, Book::from_draft(id, draft));
        debug!(book_id = %id, books = tables.books.len(), "book saved in memory");

        Ok(id)
    }

    async fn edit_book(&self, id: &str, draft: BookDraft) -> Result<()> {
        let id = parse_id(id)?;
        let mut tables = self.tables.write().await;

        let current = tables.live_book_mut(&id)?;
        let title_changed = current.name != draft.name || current.author != draft.author;

        if title_changed && tables.title_taken(&draft.name, &draft.author, Some(id)) {
            return Err(LibraryError::AlreadyExists(Entity::Book));
        }

        *tables.live_book_mut(&id)? = Book::from_draft(id, draft);
        Ok(())
    }

    async fn delete_book(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        let mut tables = self.tables.write().await;
        tables.live_book_mut(&id)?.deleted = true;
        Ok(())
    }

    async fn purge_deleted_books(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.books.len();
        tables.books.retain(|_, b| !b.deleted);
        Ok((before - tables.books.len()) as u64)
    }
}

impl Repository for MemoryStore {
    fn backend(&self) -> BackendKind {
        BackendKind::InMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio_test::{assert_err, assert_ok};

    fn ann() -> UserDraft {
        UserDraft::new("Ann", "a@x.com", "longpass1", 20)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();

        let id = store.save_user(ann()).await.unwrap();
        let stored = store.get_user(&id.to_string()).await.unwrap();
        assert_ne!(stored.password, "longpass1");
        assert_eq!(stored.name, "Ann");
        assert_eq!(stored.email, "a@x.com");
        assert_eq!(stored.age, 20);

        let login = UserLogin::new("a@x.com", "longpass1");
        assert_eq!(store.validate_credentials(&login).await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        store.save_user(ann()).await.unwrap();

        let wrong_password = store
            .validate_credentials(&UserLogin::new("a@x.com", "wrong"))
            .await;
        assert!(matches!(wrong_password, Err(LibraryError::InvalidCredential)));

        let unknown_email = store
            .validate_credentials(&UserLogin::new("nobody@x.com", "longpass1"))
            .await;
        assert!(matches!(unknown_email, Err(LibraryError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_first_user_intact() {
        let store = MemoryStore::new();
        let id = store.save_user(ann()).await.unwrap();
        let before = store.get_user(&id.to_string()).await.unwrap();

        let dup = UserDraft::new("Impostor", "a@x.com", "otherpass9", 40);
        assert!(matches!(
            store.save_user(dup).await,
            Err(LibraryError::AlreadyExists(Entity::User))
        ));

        let after = store.get_user(&id.to_string()).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_collections() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.list_users().await,
            Err(LibraryError::EmptyCollection(Entity::User))
        ));
        assert!(matches!(
            store.list_books().await,
            Err(LibraryError::EmptyCollection(Entity::Book))
        ));
    }

    #[tokio::test]
    async fn test_identifier_errors() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_user("42").await,
            Err(LibraryError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.get_book(&Uuid::new_v4().to_string()).await,
            Err(LibraryError::NotFound(Entity::Book))
        ));
        assert!(matches!(
            store.delete_user(&Uuid::new_v4().to_string()).await,
            Err(LibraryError::NotFound(Entity::User))
        ));
    }

    #[tokio::test]
    async fn test_edit_user_keeps_identity_and_hash() {
        let store = MemoryStore::new();
        let id = store.save_user(ann()).await.unwrap();
        let original = store.get_user(&id.to_string()).await.unwrap();

        let renamed = UserDraft::new("Ann B.", "ann@x.com", "longpass1", 21);
        assert_ok!(store.edit_user(&id.to_string(), renamed).await);

        let edited = store.get_user(&id.to_string()).await.unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.date_registration, original.date_registration);
        assert_eq!(edited.name, "Ann B.");
        assert_eq!(edited.email, "ann@x.com");
        // same password verifies, so the stored hash is kept as is
        assert_eq!(edited.password, original.password);
    }

    #[tokio::test]
    async fn test_edit_user_rehashes_new_password() {
        let store = MemoryStore::new();
        let id = store.save_user(ann()).await.unwrap();
        let original = store.get_user(&id.to_string()).await.unwrap();

        let changed = UserDraft::new("Ann", "a@x.com", "brandnew99", 20);
        assert_ok!(store.edit_user(&id.to_string(), changed).await);

        let edited = store.get_user(&id.to_string()).await.unwrap();
        assert_ne!(edited.password, original.password);
        assert_ne!(edited.password, "brandnew99");
        assert_err!(
            store
                .validate_credentials(&UserLogin::new("a@x.com", "longpass1"))
                .await
        );
        assert_eq!(
            store
                .validate_credentials(&UserLogin::new("a@x.com", "brandnew99"))
                .await
                .unwrap(),
            id
        );
    }

    #[tokio::test]
    async fn test_edit_user_email_conflict() {
        let store = MemoryStore::new();
        let ann_id = store.save_user(ann()).await.unwrap();
        store
            .save_user(UserDraft::new("Bob", "b@x.com", "longpass2", 30))
            .await
            .unwrap();

        let steal = UserDraft::new("Ann", "b@x.com", "longpass1", 20);
        assert!(matches!(
            store.edit_user(&ann_id.to_string(), steal).await,
            Err(LibraryError::AlreadyExists(Entity::User))
        ));
        assert_eq!(
            store.get_user(&ann_id.to_string()).await.unwrap().email,
            "a@x.com"
        );
    }

    #[tokio::test]
    async fn test_delete_user_is_hard() {
        let store = MemoryStore::new();
        let id = store.save_user(ann()).await.unwrap();

        assert_ok!(store.delete_user(&id.to_string()).await);
        assert!(matches!(
            store.get_user(&id.to_string()).await,
            Err(LibraryError::NotFound(Entity::User))
        ));
        // the email is free again
        assert_ok!(store.save_user(ann()).await);
    }

    #[tokio::test]
    async fn test_book_scenario() {
        let store = MemoryStore::new();

        let id = store.save_book(BookDraft::new("Dune", "Herbert")).await.unwrap();
        assert!(matches!(
            store.save_book(BookDraft::new("Dune", "Herbert")).await,
            Err(LibraryError::AlreadyExists(Entity::Book))
        ));

        assert_ok!(store.delete_book(&id.to_string()).await);
        assert!(matches!(
            store.get_book(&id.to_string()).await,
            Err(LibraryError::NotFound(Entity::Book))
        ));
        // repeat delete of a soft-deleted book is not a no-op
        assert!(matches!(
            store.delete_book(&id.to_string()).await,
            Err(LibraryError::NotFound(Entity::Book))
        ));
        // soft-deleted rows don't block re-creation
        assert_ok!(store.save_book(BookDraft::new("Dune", "Herbert")).await);
    }

    #[tokio::test]
    async fn test_edit_book() {
        let store = MemoryStore::new();
        let dune = store.save_book(BookDraft::new("Dune", "Herbert")).await.unwrap();
        store
            .save_book(BookDraft::new("Emma", "Austen"))
            .await
            .unwrap();

        // description-only edit keeps the same key
        let described = BookDraft::new("Dune", "Herbert").with_description("Spice");
        assert_ok!(store.edit_book(&dune.to_string(), described).await);
        assert_eq!(
            store.get_book(&dune.to_string()).await.unwrap().description.as_deref(),
            Some("Spice")
        );

        // moving onto another live title conflicts
        assert!(matches!(
            store
                .edit_book(&dune.to_string(), BookDraft::new("Emma", "Austen"))
                .await,
            Err(LibraryError::AlreadyExists(Entity::Book))
        ));

        // same name, different author is a different key
        assert_ok!(
            store
                .edit_book(&dune.to_string(), BookDraft::new("Emma", "Tennant"))
                .await
        );
        let edited = store.get_book(&dune.to_string()).await.unwrap();
        assert_eq!(edited.id, dune);
        assert_eq!(edited.author, "Tennant");
    }

    #[tokio::test]
    async fn test_edit_deleted_book_is_not_found() {
        let store = MemoryStore::new();
        let id = store.save_book(BookDraft::new("Dune", "Herbert")).await.unwrap();
        store.delete_book(&id.to_string()).await.unwrap();

        assert!(matches!(
            store
                .edit_book(&id.to_string(), BookDraft::new("Dune", "Herbert"))
                .await,
            Err(LibraryError::NotFound(Entity::Book))
        ));
    }

    #[tokio::test]
    async fn test_purge_removes_only_deleted() {
        let store = MemoryStore::new();
        let mut doomed = Vec::new();
        for i in 0..5 {
            let id = store
                .save_book(BookDraft::new(format!("Doomed {i}"), "Anon"))
                .await
                .unwrap();
            doomed.push(id);
        }
        for i in 0..3 {
            store
                .save_book(BookDraft::new(format!("Kept {i}"), "Anon"))
                .await
                .unwrap();
        }
        for id in &doomed {
            store.delete_book(&id.to_string()).await.unwrap();
        }

        assert_eq!(store.purge_deleted_books().await.unwrap(), 5);
        assert_eq!(store.list_books().await.unwrap().len(), 3);
        assert_eq!(store.tables.read().await.books.len(), 3);
        assert_eq!(store.purge_deleted_books().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_during_purge() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..200 {
            let id = store
                .save_book(BookDraft::new(format!("Book {i}"), "Anon"))
                .await
                .unwrap();
            if i % 2 == 0 {
                store.delete_book(&id.to_string()).await.unwrap();
            }
        }

        let done = Arc::new(AtomicBool::new(false));
        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let done = done.clone();
            readers.push(tokio::spawn(async move {
                let mut reads = 0usize;
                while !done.load(Ordering::Acquire) || reads == 0 {
                    let raw = store.tables.read().await.books.len();
                    assert!(raw == 200 || raw == 100, "observed partial purge: {raw}");
                    assert_eq!(store.list_books().await.unwrap().len(), 100);
                    reads += 1;
                    tokio::task::yield_now().await;
                }
                reads
            }));
        }

        // Let the readers get going before the purge lands
        tokio::time::sleep(Duration::from_millis(20)).await;
        let purged = store.purge_deleted_books().await.unwrap();
        assert_eq!(purged, 100);
        tokio::time::sleep(Duration::from_millis(20)).await;
        done.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_password_edit_does_not_block_book_reads() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_book(BookDraft::new("Dune", "Herbert"))
            .await
            .unwrap();
        let id = store
            .save_user(UserDraft::new("Ann", "a@x.com", "longpass1", 20))
            .await
            .unwrap();

        // Time one full edit (verify + rehash) as the yardstick
        let started = Instant::now();
        store
            .edit_user(
                &id.to_string(),
                UserDraft::new("Ann", "a@x.com", "brandnew99", 20),
            )
            .await
            .unwrap();
        let edit_cost = started.elapsed();

        let editor = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .edit_user(
                        &id.to_string(),
                        UserDraft::new("Ann", "a@x.com", "another999", 20),
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        let started = Instant::now();
        for _ in 0..10 {
            assert_eq!(store.list_books().await.unwrap().len(), 1);
        }
        let reads = started.elapsed();

        assert_ok!(editor.await.unwrap());
        assert!(
            reads < edit_cost / 2,
            "book reads took {reads:?} while an edit costs {edit_cost:?}"
        );
        assert_ok!(
            store
                .validate_credentials(&UserLogin::new("a@x.com", "another999"))
                .await
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_password_edits_leave_one_valid_hash() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .save_user(UserDraft::new("Ann", "a@x.com", "longpass1", 20))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for pwd in ["firstpass1", "secondpass2"] {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .edit_user(&id.to_string(), UserDraft::new("Ann", "a@x.com", pwd, 20))
                    .await
            }));
        }
        for task in tasks {
            assert_ok!(task.await.unwrap());
        }

        let first = store
            .validate_credentials(&UserLogin::new("a@x.com", "firstpass1"))
            .await;
        let second = store
            .validate_credentials(&UserLogin::new("a@x.com", "secondpass2"))
            .await;
        assert!(first.is_ok() != second.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_saves_allow_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.save_book(BookDraft::new("Dune", "Herbert")).await
            }));
        }

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(LibraryError::AlreadyExists(Entity::Book)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);
    }
}
