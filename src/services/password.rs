//! Credential boundary
//!
//! Secrets are sealed with Argon2id before they reach the store, unless
//! hashing is switched off in the configuration, in which case they are kept
//! verbatim. Verification understands both forms, so a store written with
//! hashing off keeps working after it is switched on.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Prefix of every PHC string produced by the argon2 crate
const ARGON2_PREFIX: &str = "$argon2";

/// Hash a secret using Argon2id with the crate's default parameters.
///
/// Returns the PHC string (algorithm, parameters, salt and hash).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(hash.to_string())
}

/// Verify a secret against a stored PHC string.
///
/// # Errors
///
/// Returns an error if `hash` is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}

/// How secrets are stored and compared
#[derive(Debug, Clone, Copy)]
pub struct CredentialPolicy {
    pub hash_secrets: bool,
}

impl CredentialPolicy {
    pub fn new(hash_secrets: bool) -> Self {
        Self { hash_secrets }
    }

    /// Turn a submitted secret into its stored form
    pub fn seal(&self, secret: &str) -> Result<String> {
        if self.hash_secrets {
            hash_password(secret).context("Failed to seal secret")
        } else {
            Ok(secret.to_string())
        }
    }

    /// Compare a submitted secret with a stored one, whichever form it has.
    pub fn matches(&self, secret: &str, stored: &str) -> Result<bool> {
        if stored.starts_with(ARGON2_PREFIX) {
            verify_password(secret, stored)
        } else {
            Ok(secret == stored)
        }
    }
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
