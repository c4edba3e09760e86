//! Book types

use crate::validation::{self, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub author: String,
    #[serde(rename = "date_wrt", default, skip_serializing_if = "Option::is_none")]
    pub date_writing: Option<NaiveDate>,
    /// Soft-delete marker, set by delete and cleared only by a purge
    #[serde(default)]
    pub deleted: bool,
}

impl Book {
    pub fn from_draft(id: Uuid, draft: BookDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            author: draft.author,
            date_writing: draft.date_writing,
            deleted: false,
        }
    }

    /// Whether this live row holds the (name, author) key
    pub fn same_title(&self, name: &str, author: &str) -> bool {
        !self.deleted && self.name == name && self.author == author
    }
}

/// Book create / edit payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub name: String,
    #[serde(rename = "desc", default)]
    pub description: Option<String>,
    pub author: String,
    #[serde(rename = "date_wrt", default)]
    pub date_writing: Option<NaiveDate>,
}

impl BookDraft {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            author: author.into(),
            date_writing: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required("name", &self.name)?;
        validation::required("author", &self.author)
    }
}
