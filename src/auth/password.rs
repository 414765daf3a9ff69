use std::borrow::Cow;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use tracing::error;

/// Inputs longer than this are replaced by the hex SHA-256 of their bytes
/// before the slow hash. Plain truncation would collapse distinct over-long
/// passwords into colliding hashes.
const PRE_DIGEST_THRESHOLD: usize = 72;

fn normalize(plain: &str) -> Cow<'_, str> {
    if plain.len() > PRE_DIGEST_THRESHOLD {
        Cow::Owned(hex::encode(Sha256::digest(plain.as_bytes())))
    } else {
        Cow::Borrowed(plain)
    }
}

/// Well-formed argon2 string that matches no password. Login verifies
/// against it when the email is unknown, so both failure paths cost a hash
/// verification.
pub(crate) const PHANTOM_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$QUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUE";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(normalize(plain).as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Ok(false) for a mismatch; Err only for a malformed stored hash, which
/// signals corruption rather than a bad credential.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(normalize(plain).as_bytes(), &parsed)
        .is_ok())
}
