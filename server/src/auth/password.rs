//! Password hashing behind a small trait, with the argon2id implementation.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use rand::rngs::OsRng;
use tracing::warn;

/// Hash/compare contract the credential verifier depends on.
///
/// Both calls are CPU-bound and may be slow; callers run them off the async
/// reactor.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> anyhow::Result<String>;

    /// `false` for a mismatch and for a digest that cannot be parsed.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

/// Argon2id with default parameters and a fresh random salt per hash.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
