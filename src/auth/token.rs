//! Stateless session tokens.
//!
//! Tokens are HS256 JWTs carrying `{sub, iat, exp, jti}`. Nothing is
//! persisted: validity is decided by signature and expiry alone, and expiry
//! is always judged against the issuer's [`Clock`].

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 3600;

/// Source of "now" in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Settable clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let secs = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username.
    pub sub: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds. Always strictly after `iat`.
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing key is not configured")]
    KeyUnavailable,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and checks session tokens.
pub struct TokenIssuer {
    keys: Option<SigningKeys>,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Build an issuer. A missing or blank secret yields an issuer whose
    /// every `issue` fails with [`TokenError::KeyUnavailable`].
    pub fn new(secret: Option<&str>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let keys = secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SigningKeys {
                encoding: EncodingKey::from_secret(s.as_bytes()),
                decoding: DecodingKey::from_secret(s.as_bytes()),
            });

        Self {
            keys,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1),
            clock,
        }
    }

    pub fn has_key(&self) -> bool {
        self.keys.is_some()
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a signed token for `subject`, expiring one lifetime from now.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::KeyUnavailable)?;
        let iat = self.clock.now();
        let claims = Claims {
            sub: subject.to_owned(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::KeyUnavailable)?;

        // Expiry is judged against our clock below, not the library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &keys.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        if claims.exp <= self.clock.now() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn issuer_at(clock: Arc<ManualClock>) -> TokenIssuer {
        TokenIssuer::new(Some("test-secret"), Duration::from_secs(3600), clock)
    }

    #[test]
    fn issued_token_decodes_to_subject() {
        let clock = Arc::new(ManualClock::new(T0));
        let issuer = issuer_at(clock);

        let token = issuer.issue("alice").unwrap();
        assert!(!token.is_empty());

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, T0);
        assert_eq!(claims.exp, T0 + 3600);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_expires_after_lifetime() {
        let clock = Arc::new(ManualClock::new(T0));
        let issuer = issuer_at(clock.clone());
        let token = issuer.issue("alice").unwrap();

        clock.advance(Duration::from_secs(3599));
        assert!(issuer.verify(&token).is_ok());

        clock.advance(Duration::from_secs(1));
        assert!(matches!(issuer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn missing_key_fails_issue() {
        let clock = Arc::new(ManualClock::new(T0));
        for secret in [None, Some(""), Some("   ")] {
            let issuer = TokenIssuer::new(secret, Duration::from_secs(60), clock.clone());
            assert!(!issuer.has_key());
            assert!(matches!(
                issuer.issue("alice"),
                Err(TokenError::KeyUnavailable)
            ));
        }
    }

    #[test]
    fn token_from_other_key_is_invalid() {
        let clock = Arc::new(ManualClock::new(T0));
        let ours = issuer_at(clock.clone());
        let theirs = TokenIssuer::new(Some("other-secret"), Duration::from_secs(3600), clock);

        let token = theirs.issue("mallory").unwrap();
        assert!(matches!(ours.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let issuer = issuer_at(Arc::new(ManualClock::new(T0)));
        assert!(matches!(
            issuer.verify("not.a.jwt"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let issuer = issuer_at(Arc::new(ManualClock::new(T0)));
        let t1 = issuer.issue("alice").unwrap();
        let t2 = issuer.issue("alice").unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn zero_ttl_still_expires_after_issue() {
        let clock = Arc::new(ManualClock::new(T0));
        let issuer = TokenIssuer::new(Some("k"), Duration::ZERO, clock.clone());
        assert_eq!(issuer.ttl_secs(), 1);

        let claims = issuer.verify(&issuer.issue("alice").unwrap()).unwrap();
        assert!(claims.exp > claims.iat);
    }
}
