//! User operations

use library_core::ports::Repository;
use library_core::{Result, User, UserDraft, UserLogin};
use std::sync::Arc;
use uuid::Uuid;

/// Forwards user operations to whichever backend was opened at startup
pub struct UserService {
    repo: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Self-service sign up
    pub async fn registration_user(&self, draft: UserDraft) -> Result<Uuid> {
        self.repo.save_user(draft).await
    }

    pub async fn login_user(&self, login: &UserLogin) -> Result<Uuid> {
        self.repo.validate_credentials(login).await
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.repo.list_users().await
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.repo.get_user(id).await
    }

    /// Account created by an authenticated caller
    pub async fn add_user(&self, draft: UserDraft) -> Result<Uuid> {
        self.repo.save_user(draft).await
    }

    pub async fn edit_user(&self, id: &str, draft: UserDraft) -> Result<()> {
        self.repo.edit_user(id, draft).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.repo.delete_user(id).await
    }
}
