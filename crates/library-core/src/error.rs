//! Error types for the library service

use library_types::{Entity, ValidationError};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("{0} already exists")]
    AlreadyExists(Entity),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("{0} storage is empty")]
    EmptyCollection(Entity),

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("credential codec failure: {0}")]
    CredentialCodec(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl LibraryError {
    /// Connectivity, timeout and engine failures
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, LibraryError::Timeout(_) | LibraryError::Persistence(_))
    }

    /// Stable snake_case code used in error payloads
    pub fn code(&self) -> &'static str {
        match self {
            LibraryError::NotFound(_) => "not_found",
            LibraryError::AlreadyExists(_) => "already_exists",
            LibraryError::InvalidIdentifier(_) => "invalid_identifier",
            LibraryError::InvalidCredential => "invalid_credential",
            LibraryError::EmptyCollection(_) => "empty_collection",
            LibraryError::Timeout(_) => "timeout",
            LibraryError::Persistence(_) => "persistence_failure",
            LibraryError::CredentialCodec(_) => "credential_codec",
            LibraryError::Validation(_) => "validation_error",
        }
    }
}
