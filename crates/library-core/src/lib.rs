//! Library Core
//!
//! Error taxonomy, credential hashing and the storage contract shared by the
//! persistent and in-memory backends.

// Re-export pure types from library-types
pub use library_types::*;

pub mod credentials;
pub mod error;
pub mod ids;
pub mod ports;

pub use error::{LibraryError, Result};
pub use ids::parse_id;
