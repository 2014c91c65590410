//! Password hashing with Argon2id PHC strings.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use once_cell::sync::Lazy;

// Verified against when a principal is unknown or has no hash, so both paths
// cost one Argon2 verification.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("crewgate-dummy-password").ok());

/// Hash a secret into a PHC string.
///
/// # Errors
/// Returns an error if Argon2 fails to hash the input.
pub fn hash_password(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Constant-time comparison of `secret` against a stored PHC string.
/// Malformed digests never verify.
#[must_use]
pub fn verify_password(secret: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one verification so unknown principals cost the same as known ones.
pub fn verify_dummy(secret: &str) {
    if let Some(digest) = DUMMY_HASH.as_deref() {
        let _ = verify_password(secret, digest);
    }
}
