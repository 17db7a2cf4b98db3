//! Credential verification and session-token issuance.
//!
//! Provides:
//! - Password hashing with PBKDF2-HMAC-SHA256 (PHC string format, per-hash
//!   random salt, configurable rounds)
//! - Constant-time verification that reports malformed hashes as a non-match
//! - Stateless HS256 session tokens with an injectable clock
//!
//! ## Design Decisions
//! - Tokens are self-contained; there is no server-side session table and no
//!   revocation before expiry.
//! - Hashing and verification are CPU-bound and run on the blocking pool,
//!   never while a store lock is held.

pub mod password;
pub mod token;

pub use password::{PasswordError, PasswordHasher, DEFAULT_HASH_ROUNDS};
pub use token::{
    Claims, Clock, ManualClock, SystemClock, TokenError, TokenIssuer, DEFAULT_TOKEN_TTL_SECS,
};
