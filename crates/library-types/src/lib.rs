//! Library Types - Pure type definitions shared by the storage core and the server
//!
//! This crate contains only data types and field validation, with no async
//! runtime or database dependencies.

pub mod book;
pub mod user;
pub mod validation;

pub use book::*;
pub use user::*;
pub use validation::ValidationError;

use serde::{Deserialize, Serialize};

/// Entity kinds managed by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    User,
    Book,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Book => write!(f, "book"),
        }
    }
}

/// Storage backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Postgres,
    InMemory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::InMemory => write!(f, "in_memory"),
        }
    }
}
