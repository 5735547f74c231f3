//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC-format strings: algorithm id, cost parameters, salt and
//! digest all embedded, so no separate salt bookkeeping is needed. Plain
//! string comparison of passwords is never an option anywhere in this crate.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, Error as HashError, SaltString},
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier,
};
use rand::{distributions::Alphanumeric, Rng};
use tracing::warn;

const DUMMY_PASSWORD_LENGTH: usize = 24;

#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if the hashing operation itself fails; the message
    /// never contains the plaintext.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| anyhow!("password hashing failed: {err}"))?;

        Ok(hash.to_string())
    }

    /// Check a candidate password against a stored PHC string.
    ///
    /// A malformed stored hash verifies as false, never as a panic.
    #[must_use]
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            warn!("stored password hash is not a valid PHC string");
            return false;
        };

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(HashError::Password) => false,
            Err(err) => {
                warn!("password verification error: {err}");
                false
            }
        }
    }

    /// Burn the same work as a real verification when no credential record
    /// exists, so unknown usernames stay in the timing class of a wrong
    /// password. Always returns false.
    #[must_use]
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let dummy: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(DUMMY_PASSWORD_LENGTH)
            .map(char::from)
            .collect();

        if let Ok(dummy_hash) = self.hash(&dummy) {
            let _ = self.verify(plaintext, &dummy_hash);
        }

        false
    }
}
