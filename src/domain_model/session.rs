use super::{Claims, CsrfSecret};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

/// What the transport writes back after a successful issue or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub auth_token: AuthToken,
    pub refresh_token: RefreshToken,
    pub csrf_secret: CsrfSecret,
    pub auth_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// A token pair together with the claims of the auth token it carries.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: SessionTokens,
    pub claims: Claims,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Auth token still valid, refresh token expiry extended.
    PassThrough,
    /// Auth token expired, new auth token, new secret, refresh token re-signed.
    Rotated,
}
