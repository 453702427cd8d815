//! Password and recovery PIN hashing.
//!
//! # Security
//!
//! - Argon2id, 46 MiB memory, 1 iteration, 1 lane, 32-byte output
//! - Random salt per hash, stored with the parameters in a PHC string
//! - Verification reads the parameters back from the stored hash

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

/// Errors while hashing or checking a secret.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid hashing parameters: {0}")]
    Params(String),

    #[error("Hashing failed: {0}")]
    Hashing(String),

    #[error("Stored credential hash is malformed")]
    MalformedHash,
}

fn hasher() -> Result<Argon2<'static>, CredentialError> {
    let params = Params::new(47104, 1, 1, Some(32))
        .map_err(|e| CredentialError::Params(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a secret into a PHC string.
///
/// # Errors
/// Returns error if the hasher rejects its parameters or input.
pub fn hash_secret(secret: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a secret against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unusable hashes.
///
/// # Errors
/// Returns `MalformedHash` if `stored` does not parse.
pub fn verify_secret(secret: &str, stored: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored).map_err(|_| CredentialError::MalformedHash)?;
    match hasher()?.verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_secret("correct horse").expect("Should hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("correct horse", &hash).expect("Should verify"));
        assert!(!verify_secret("wrong horse", &hash).expect("Should verify"));
    }

    #[test]
    fn test_salts_differ() {
        let first = hash_secret("12345").expect("Should hash");
        let second = hash_secret("12345").expect("Should hash");
        assert_ne!(first, second);
        assert!(verify_secret("12345", &second).expect("Should verify"));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            verify_secret("anything", "not-a-phc-string"),
            Err(CredentialError::MalformedHash)
        ));
    }
}
