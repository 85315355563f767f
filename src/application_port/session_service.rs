use crate::domain_model::{AuthToken, Claims, CustomClaims, RefreshToken, Session, Transition};
use crate::domain_port::{CodecError, RevocationError, SecretError};

/// Why a request was refused. Every variant maps to an auth-failure status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("no token presented")]
    MissingToken,
    #[error("no csrf secret presented")]
    MissingCsrfSecret,
    #[error("csrf secret does not match auth token")]
    CsrfMismatch,
    #[error("auth token invalid")]
    InvalidAuthToken,
    #[error("auth token expired")]
    AuthTokenExpired,
    #[error("refresh token invalid")]
    InvalidRefreshToken,
    #[error("auth and refresh token belong to different sessions")]
    SessionMismatch,
    #[error("session revoked")]
    Revoked,
    #[error("revocation check failed")]
    RevocationCheckFailed,
    #[error("refresh token expired")]
    RefreshExpired,
    #[error("server is not authorized to issue new tokens")]
    VerifyOnly,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unauthorized: {0}")]
    Unauthorized(Denial),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<Denial> for SessionError {
    fn from(denial: Denial) -> Self {
        SessionError::Unauthorized(denial)
    }
}

impl From<CodecError> for SessionError {
    fn from(error: CodecError) -> Self {
        SessionError::InternalError(error.to_string())
    }
}

impl From<SecretError> for SessionError {
    fn from(error: SecretError) -> Self {
        SessionError::InternalError(error.to_string())
    }
}

impl SessionError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Unauthorized(_))
    }

    pub fn denial(&self) -> Option<Denial> {
        match self {
            SessionError::Unauthorized(denial) => Some(*denial),
            SessionError::InternalError(_) => None,
        }
    }
}

/// Caller-supplied identity for a new login.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub subject: String,
    pub custom_claims: CustomClaims,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub session: Session,
    pub transition: Transition,
}

/// Result of a logout. Termination itself never fails.
#[derive(Debug)]
pub struct Termination {
    /// `false` when the refresh token could not be parsed, so there was no id to revoke.
    pub revocation_attempted: bool,
    pub revocation_error: Option<RevocationError>,
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Start a session: fresh id, fresh secret, both tokens.
    async fn issue(&self, request: NewSession) -> Result<Session, SessionError>;

    /// Validate the presented triple and pass it through or rotate it.
    async fn refresh(
        &self,
        auth_token: &AuthToken,
        refresh_token: &RefreshToken,
        presented_secret: &str,
    ) -> Result<RefreshOutcome, SessionError>;

    /// Logout. Revokes the session id when the refresh token can be read.
    async fn terminate(&self, refresh_token: Option<&RefreshToken>) -> Termination;

    /// Claims of a signature-checked, unexpired auth token.
    fn read_claims(&self, auth_token: &AuthToken) -> Result<Claims, SessionError>;
}
