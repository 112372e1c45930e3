//! Self-signed assertions for the directory system's API.
//!
//! The directory system authenticates callers with a short-lived HS256
//! token carrying a fixed audience and a `kid` header naming the shared
//! secret. Each outbound call mints a fresh assertion; at 60 seconds of
//! lifetime there is nothing worth caching.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Default assertion lifetime: 60 seconds.
pub const DEFAULT_ASSERTION_LIFETIME: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    aud: String,
    exp: i64,
}

/// Mints bearer assertions for directory-system calls.
#[derive(Debug, Clone)]
pub struct AssertionSigner {
    secret: String,
    key_id: String,
    audience: String,
    lifetime: Duration,
}

impl AssertionSigner {
    #[must_use]
    pub fn new(
        secret: impl Into<String>,
        key_id: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            key_id: key_id.into(),
            audience: audience.into(),
            lifetime: DEFAULT_ASSERTION_LIFETIME,
        }
    }

    /// Overrides the assertion lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Signs a fresh assertion.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails (effectively unreachable for
    /// HS256 with valid UTF-8 inputs).
    pub fn generate(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        let claims = AssertionClaims {
            aud: self.audience.clone(),
            exp: OffsetDateTime::now_utc().unix_timestamp() + self.lifetime.as_secs() as i64,
        };

        jsonwebtoken::encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode_header};

    const SECRET: &str = "test-shared-secret-with-enough-entropy";

    #[test]
    fn assertion_round_trips_with_shared_secret() {
        let signer = AssertionSigner::new(SECRET, "bridge", "directory.example.com");
        let token = signer.generate().unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.kid.as_deref(), Some("bridge"));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["directory.example.com"]);
        let data = jsonwebtoken::decode::<AssertionClaims>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap();
        assert_eq!(data.claims.aud, "directory.example.com");
    }

    #[test]
    fn expiry_is_sixty_seconds_out() {
        let signer = AssertionSigner::new(SECRET, "bridge", "directory.example.com");
        let token = signer.generate().unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["directory.example.com"]);
        let data = jsonwebtoken::decode::<AssertionClaims>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap();

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let remaining = data.claims.exp - now;
        assert!((55..=60).contains(&remaining), "remaining {remaining}s");
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let signer = AssertionSigner::new(SECRET, "bridge", "directory.example.com");
        let token = signer.generate().unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["directory.example.com"]);
        assert!(
            jsonwebtoken::decode::<AssertionClaims>(
                &token,
                &DecodingKey::from_secret(b"other-secret"),
                &validation,
            )
            .is_err()
        );
    }
}
