//! Identifier parsing

use crate::{LibraryError, Result};
use uuid::Uuid;

/// Parse a path/id token into a UUID, rejecting anything malformed
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| LibraryError::InvalidIdentifier(raw.to_string()))
}
