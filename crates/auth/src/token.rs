//! Stateless identity tokens (HS256 JWT).
//!
//! A token encodes the user id plus an issued-at/expiry window. There is no
//! server-side session table: any instance holding the secret can validate,
//! and expiry is the only revocation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use eventhub_core::UserId;

use crate::claims::{TokenClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature, encoding, or claims did not check out. Deliberately carries
    /// no detail about which.
    #[error("invalid token")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => TokenError::Expired,
            TokenValidationError::NotYetValid
            | TokenValidationError::InvalidTimeWindow
            | TokenValidationError::InvalidSubject => TokenError::Invalid,
        }
    }
}

/// Issues and validates identity tokens.
///
/// `now` is explicit on both sides so that expiry is deterministic in tests.
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError>;

    /// All-or-nothing: either the embedded user id, or an error.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError>;
}

impl<T> TokenService for std::sync::Arc<T>
where
    T: TokenService + ?Sized,
{
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        (**self).issue(user_id, now)
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        (**self).validate(token, now)
    }
}

/// HMAC-SHA256 signed JWTs with a fixed time-to-live.
#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation() -> Validation {
        // Time checks are done by `validate_claims` against the caller's `now`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl TokenService for Hs256TokenService {
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims::new(user_id, now, self.ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                TokenError::Invalid
            })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims.user_id()?)
    }
}
