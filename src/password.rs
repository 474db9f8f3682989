//! Password hashing and verification.
//!
//! Passwords are transformed through Argon2id with a per-password random
//! salt before storage; the plaintext is never persisted or logged.

use crate::domain::{AuthError, AuthResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use anyhow::anyhow;

// ---

/// Minimum password length accepted at registration and reset.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Checks the plaintext against the password policy. Applied wherever a
/// new password enters the system, never at login.
pub fn validate_password(password: &str) -> AuthResult<()> {
    // ---
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordPolicy);
    }
    Ok(())
}

/// Hashes a plaintext password into a PHC-format Argon2id string.
pub fn hash_password(password: &str) -> AuthResult<String> {
    // ---
    validate_password(password)?;

    Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Internal(anyhow!("failed to generate a password hash: {err}")))
}

/// Verifies a plaintext password against a stored PHC hash string.
///
/// A malformed stored hash counts as a mismatch rather than an internal
/// error: the caller's response must not vary with why verification failed.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    // ---
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::error!("stored password hash failed to parse");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
