use crate::domain_model::Claims;
use chrono::{DateTime, Utc};

/// Three-way judgment of a presented token.
#[derive(Debug, Clone)]
pub enum Verification {
    Valid(Claims),
    /// Signature good, only the expiry check failed.
    ExpiredOnly(Claims),
    /// Bad signature, wrong algorithm or malformed token.
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("no signing key, server is verify-only")]
    NoSigningKey,
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

pub trait TokenCodec: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String, CodecError>;
    /// Signature is checked first, expiry is judged against `now`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Verification;
    fn can_sign(&self) -> bool;
}
