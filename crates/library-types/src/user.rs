//! User types

use crate::validation::{self, ValidationError, MIN_USER_AGE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored user account
///
/// `password` always holds the Argon2 PHC hash and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: String,
    pub age: i32,
    #[serde(rename = "date_reg")]
    pub date_registration: DateTime<Utc>,
}

/// User registration / edit payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    #[serde(rename = "pwd")]
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub age: i32,
}

impl UserDraft {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        age: i32,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            email: email.into(),
            age,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required("name", &self.name)?;
        validation::email("email", &self.email)?;
        validation::password("pwd", &self.password)?;
        if self.age < MIN_USER_AGE {
            return Err(ValidationError::new(
                "age",
                format!("must be at least {}", MIN_USER_AGE),
            ));
        }
        Ok(())
    }
}

/// User login request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLogin {
    pub email: String,
    #[serde(rename = "pwd")]
    pub password: String,
}

impl UserLogin {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::email("email", &self.email)?;
        validation::password("pwd", &self.password)
    }
}
