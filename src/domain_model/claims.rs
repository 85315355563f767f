use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-defined payload carried by both tokens of a session (e.g. a role).
///
/// Propagation across rotation is a structural copy of the whole map.
pub type CustomClaims = serde_json::Map<String, serde_json::Value>;

/// Identifier shared by the auth and refresh token of one login.
/// It is the unit of revocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anti-forgery secret bound into both tokens and echoed out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfSecret(pub String);

impl CsrfSecret {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payload of both the auth token and the refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "jti")]
    pub id: SessionId,
    #[serde(rename = "sub", default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "csrf")]
    pub csrf_secret: CsrfSecret,
    #[serde(rename = "custom", default)]
    pub custom_claims: CustomClaims,
}

impl Claims {
    /// Expiry as an instant, `None` if the timestamp is out of range.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.expires_at, 0)
    }

    /// Expired strictly after `exp`, at second granularity.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires_at
    }
}
