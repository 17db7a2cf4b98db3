//! One-way password hashing.
//!
//! Hashes are PHC strings: `$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`.
//! The rounds are stored in the hash itself, so changing the configured
//! rounds never invalidates existing credentials.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use rand::RngCore;
use thiserror::Error;

/// Default PBKDF2 rounds for new hashes.
pub const DEFAULT_HASH_ROUNDS: u32 = 100_000;

/// Salt byte length before base64 encoding.
const SALT_BYTES: usize = 16;

/// Derived key length in bytes.
const OUTPUT_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Password hasher with a fixed cost for newly created hashes.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    rounds: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ROUNDS)
    }
}

impl PasswordHasher {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// Fails only when the OS entropy source is unavailable or the
    /// underlying KDF rejects its parameters.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        rand::rngs::OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| PasswordError::Hashing(format!("entropy source unavailable: {e}")))?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hashing(e.to_string()))?;

        let hash = Pbkdf2
            .hash_password_customized(
                plaintext.as_bytes(),
                None,
                None,
                self.params(),
                salt.as_salt(),
            )
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// The digest comparison is constant time. A stored value that is not a
    /// valid PBKDF2 PHC string is reported as a mismatch, never as an error.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Pbkdf2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }

    /// Spend the cost of one verification without a stored hash.
    ///
    /// Used for unknown usernames so their rejection takes as long as a
    /// wrong password.
    pub fn verify_dummy(&self, plaintext: &str) {
        let Ok(salt) = SaltString::encode_b64(&[0u8; SALT_BYTES]) else {
            return;
        };
        let _ = Pbkdf2.hash_password_customized(
            plaintext.as_bytes(),
            None,
            None,
            self.params(),
            salt.as_salt(),
        );
    }

    fn params(&self) -> Params {
        Params {
            rounds: self.rounds,
            output_length: OUTPUT_LEN,
        }
    }
}
