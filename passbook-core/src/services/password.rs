//! Password service - one-way credential hashing
//!
//! Hashes are Argon2id PHC strings, salted per hash. Verification parses
//! the stored string, so parameter upgrades only affect new hashes.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::domain::result::{Error, Result};

const TIME_COST: u32 = 3;
const MEMORY_COST: u32 = 65536; // 64 MiB
const PARALLELISM: u32 = 4;
const HASH_LEN: usize = 32;

/// Password hashing and verification
pub struct PasswordService;

impl PasswordService {
    pub fn new() -> Self {
        Self
    }

    fn hasher() -> Result<Argon2<'static>> {
        let params = Params::new(MEMORY_COST, TIME_COST, PARALLELISM, Some(HASH_LEN))
            .map_err(|e| Error::crypto(format!("invalid hash parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with a fresh OS-random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::crypto(format!("failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC hash string
    ///
    /// Returns Ok(false) for a wrong password; Err only when the stored
    /// hash itself is unreadable.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::crypto(format!("stored hash is malformed: {}", e)))?;
        Ok(Self::hasher()?
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_the_password() {
        let service = PasswordService::new();
        let hash = service.hash("hunter2").unwrap();

        assert_ne!(hash, "hunter2");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let service = PasswordService::new();
        let first = service.hash("hunter2").unwrap();
        let second = service.hash("hunter2").unwrap();

        // Per-hash salts: equal inputs must not produce equal hashes
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_round_trip() {
        let service = PasswordService::new();
        let hash = service.hash("correct horse battery staple").unwrap();

        assert!(service.verify("correct horse battery staple", &hash).unwrap());
        assert!(!service.verify("incorrect horse", &hash).unwrap());
    }

    #[test]
    fn test_malformed_stored_hash_is_an_error() {
        let service = PasswordService::new();
        let result = service.verify("anything", "not-a-phc-string");
        assert!(matches!(result, Err(Error::Crypto(_))));
    }
}
