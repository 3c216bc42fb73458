//! Password hashing
//!
//! Sessions only talk to the `PasswordScheme` trait; the server uses
//! Argon2id with a fresh random salt per hash.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;

use crate::config::HashingConfig;
use crate::error::AppError;

/// Hash and verify plaintext passwords
pub trait PasswordScheme: Send + Sync {
    /// Produce a salted hash suitable for storage
    fn hash(&self, plain: &str) -> Result<String, AppError>;

    /// Check a plaintext password against a stored hash
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// Argon2id password scheme
///
/// Stored hashes are PHC strings (`$argon2id$v=19$...`) which carry their
/// own parameters, so changing the configured cost only affects new users.
pub struct Argon2Scheme {
    argon2: Argon2<'static>,
}

impl Argon2Scheme {
    pub fn new(config: &HashingConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| AppError::PasswordHash(format!("invalid argon2 params: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "Failed to parse stored password hash");
                return false;
            }
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}
