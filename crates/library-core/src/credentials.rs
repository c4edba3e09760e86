//! Password hashing (Argon2id, PHC string format)

use crate::{LibraryError, Result};
use argon2::password_hash::{Error as HashError, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;

/// Hash verified when a login names an unknown email, so the attempt costs
/// the same as a real verification.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("library-timing-equalizer").ok());

/// Hash a plaintext password with a fresh random salt
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LibraryError::CredentialCodec(format!("failed to hash password: {}", e)))
}

/// Check a plaintext password against a stored hash
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash could
/// not be used at all.
pub fn verify_password(hash: &str, plaintext: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| LibraryError::CredentialCodec(format!("invalid password hash: {}", e)))?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(LibraryError::CredentialCodec(format!(
            "password verification failed: {}",
            e
        ))),
    }
}

/// Burn one verification for a login against an unknown email
pub fn verify_dummy(plaintext: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, plaintext);
    }
}
