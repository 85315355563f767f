use super::ConfigurationError;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::settings;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_AUTH_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(72 * 60 * 60);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub auth_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Validate only. Issuing and rotating are refused.
    pub verify_only: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_token_ttl: DEFAULT_AUTH_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            verify_only: false,
        }
    }
}

impl SessionConfig {
    /// Zero TTLs fall back to the defaults. A TTL that cannot be added to the
    /// current time is refused here rather than on the first request.
    pub fn from_settings(auth: &settings::Auth) -> Result<Self, ConfigurationError> {
        let ttl = |secs: u64, default: Duration| {
            if secs == 0 {
                default
            } else {
                Duration::from_secs(secs)
            }
        };
        let config = Self {
            auth_token_ttl: ttl(auth.auth_token_ttl_secs, DEFAULT_AUTH_TOKEN_TTL),
            refresh_token_ttl: ttl(auth.refresh_token_ttl_secs, DEFAULT_REFRESH_TOKEN_TTL),
            verify_only: auth.verify_only,
        };
        config.check_ttls(Utc::now())?;
        Ok(config)
    }

    /// Both lifetimes must be representable as an expiry from `now`.
    pub fn check_ttls(&self, now: DateTime<Utc>) -> Result<(), ConfigurationError> {
        for (which, ttl) in [
            ("auth", self.auth_token_ttl),
            ("refresh", self.refresh_token_ttl),
        ] {
            TimeDelta::from_std(ttl)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .ok_or(ConfigurationError::TtlOutOfRange(which))?;
        }
        Ok(())
    }
}

/// The session state machine.
///
/// Holds no request-scoped state; one instance serves every request
/// concurrently. The only shared mutable resource is behind the
/// [`RevocationGate`], which the caller owns.
pub struct SessionManager {
    config: SessionConfig,
    token_codec: Arc<dyn TokenCodec>,
    secret_generator: Arc<dyn SecretGenerator>,
    revocation_gate: Arc<dyn RevocationGate>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        token_codec: Arc<dyn TokenCodec>,
        secret_generator: Arc<dyn SecretGenerator>,
        revocation_gate: Arc<dyn RevocationGate>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        if !config.verify_only && !token_codec.can_sign() {
            return Err(ConfigurationError::SigningKeyRequired);
        }
        config.check_ttls(clock.now())?;
        Ok(Self {
            config,
            token_codec,
            secret_generator,
            revocation_gate,
            clock,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> Result<i64, SessionError> {
        TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .map(|expiry| expiry.timestamp())
            .ok_or_else(|| SessionError::InternalError(format!("expiry out of range: {ttl:?}")))
    }

    fn expiry_of(claims: &Claims) -> Result<DateTime<Utc>, SessionError> {
        claims.expiry().ok_or_else(|| {
            SessionError::InternalError(format!("expiry out of range: {}", claims.expires_at))
        })
    }

    fn session(
        auth_token: AuthToken,
        auth_claims: Claims,
        refresh_token: RefreshToken,
        refresh_claims: &Claims,
    ) -> Result<Session, SessionError> {
        Ok(Session {
            tokens: SessionTokens {
                auth_token,
                refresh_token,
                csrf_secret: auth_claims.csrf_secret.clone(),
                auth_token_expires_at: Self::expiry_of(&auth_claims)?,
                refresh_token_expires_at: Self::expiry_of(refresh_claims)?,
            },
            claims: auth_claims,
        })
    }

    // Auth token still valid: leave it alone, keep the session alive by
    // re-signing the refresh token with a later expiry. The revocation gate
    // is not consulted here.
    fn pass_through(
        &self,
        auth_token: &AuthToken,
        auth_claims: Claims,
        refresh_token: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, SessionError> {
        let refresh_claims = match self.token_codec.verify(&refresh_token.0, now) {
            Verification::Valid(claims) | Verification::ExpiredOnly(claims) => claims,
            Verification::Invalid(reason) => {
                debug!(%reason, "refresh token rejected on pass-through");
                return Err(Denial::InvalidRefreshToken.into());
            }
        };
        if refresh_claims.id != auth_claims.id {
            debug!(auth = %auth_claims.id, refresh = %refresh_claims.id, "session id mismatch");
            return Err(Denial::SessionMismatch.into());
        }

        let (refresh_token, refresh_claims) = if self.config.verify_only {
            (refresh_token.clone(), refresh_claims)
        } else {
            let extended = Claims {
                expires_at: Self::expiry_from(now, self.config.refresh_token_ttl)?,
                ..refresh_claims
            };
            (RefreshToken(self.token_codec.sign(&extended)?), extended)
        };

        debug!(session = %auth_claims.id, "auth token valid, refresh token extended");
        Ok(RefreshOutcome {
            session: Self::session(auth_token.clone(), auth_claims, refresh_token, &refresh_claims)?,
            transition: Transition::PassThrough,
        })
    }

    // Auth token expired: the refresh token is the source of truth for the
    // new auth token, and the csrf secret is regenerated.
    async fn rotate(
        &self,
        auth_claims: &Claims,
        refresh_token: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, SessionError> {
        if self.config.verify_only {
            debug!("server is not authorized to issue new tokens");
            return Err(Denial::VerifyOnly.into());
        }

        let (refresh_claims, refresh_expired) = match self.token_codec.verify(&refresh_token.0, now)
        {
            Verification::Valid(claims) => (claims, false),
            Verification::ExpiredOnly(claims) => (claims, true),
            Verification::Invalid(reason) => {
                debug!(%reason, "refresh token rejected on rotation");
                return Err(Denial::InvalidRefreshToken.into());
            }
        };

        match self.revocation_gate.is_valid(&refresh_claims.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(session = %refresh_claims.id, "refresh token has been revoked");
                return Err(Denial::Revoked.into());
            }
            Err(e) => {
                warn!(session = %refresh_claims.id, error = %e, "revocation check failed");
                return Err(Denial::RevocationCheckFailed.into());
            }
        }

        if refresh_expired {
            debug!(session = %refresh_claims.id, "refresh token has expired");
            return Err(Denial::RefreshExpired.into());
        }
        if refresh_claims.id != auth_claims.id {
            debug!(auth = %auth_claims.id, refresh = %refresh_claims.id, "session id mismatch");
            return Err(Denial::SessionMismatch.into());
        }

        let csrf_secret = self.secret_generator.generate()?;
        let new_auth_claims = Claims {
            id: refresh_claims.id.clone(),
            subject: refresh_claims.subject.clone(),
            issued_at: now.timestamp(),
            expires_at: Self::expiry_from(now, self.config.auth_token_ttl)?,
            csrf_secret: csrf_secret.clone(),
            custom_claims: refresh_claims.custom_claims.clone(),
        };
        let new_refresh_claims = Claims {
            expires_at: Self::expiry_from(now, self.config.refresh_token_ttl)?,
            csrf_secret,
            ..refresh_claims
        };

        let auth_token = AuthToken(self.token_codec.sign(&new_auth_claims)?);
        let refresh_token = RefreshToken(self.token_codec.sign(&new_refresh_claims)?);

        debug!(session = %new_auth_claims.id, "auth token expired, session rotated");
        Ok(RefreshOutcome {
            session: Self::session(auth_token, new_auth_claims, refresh_token, &new_refresh_claims)?,
            transition: Transition::Rotated,
        })
    }
}

#[async_trait::async_trait]
impl SessionService for SessionManager {
    async fn issue(&self, request: NewSession) -> Result<Session, SessionError> {
        if self.config.verify_only {
            debug!("server is not authorized to issue new tokens");
            return Err(Denial::VerifyOnly.into());
        }

        let NewSession {
            subject,
            custom_claims,
        } = request;
        let now = self.clock.now();
        let csrf_secret = self.secret_generator.generate()?;

        let refresh_claims = Claims {
            id: SessionId::generate(),
            subject,
            issued_at: now.timestamp(),
            expires_at: Self::expiry_from(now, self.config.refresh_token_ttl)?,
            csrf_secret,
            custom_claims,
        };
        let auth_claims = Claims {
            expires_at: Self::expiry_from(now, self.config.auth_token_ttl)?,
            ..refresh_claims.clone()
        };

        let refresh_token = RefreshToken(self.token_codec.sign(&refresh_claims)?);
        let auth_token = AuthToken(self.token_codec.sign(&auth_claims)?);

        debug!(session = %auth_claims.id, "issued new session");
        Self::session(auth_token, auth_claims, refresh_token, &refresh_claims)
    }

    async fn refresh(
        &self,
        auth_token: &AuthToken,
        refresh_token: &RefreshToken,
        presented_secret: &str,
    ) -> Result<RefreshOutcome, SessionError> {
        if presented_secret.is_empty() {
            debug!("no csrf secret in request");
            return Err(Denial::MissingCsrfSecret.into());
        }

        let now = self.clock.now();
        let (auth_claims, auth_expired) = match self.token_codec.verify(&auth_token.0, now) {
            Verification::Valid(claims) => (claims, false),
            Verification::ExpiredOnly(claims) => (claims, true),
            Verification::Invalid(reason) => {
                debug!(%reason, "auth token rejected");
                return Err(Denial::InvalidAuthToken.into());
            }
        };

        if !constant_time_eq::constant_time_eq(
            presented_secret.as_bytes(),
            auth_claims.csrf_secret.as_str().as_bytes(),
        ) {
            debug!(session = %auth_claims.id, "csrf secret does not match auth token");
            return Err(Denial::CsrfMismatch.into());
        }

        if auth_expired {
            self.rotate(&auth_claims, refresh_token, now).await
        } else {
            self.pass_through(auth_token, auth_claims, refresh_token, now)
        }
    }

    async fn terminate(&self, refresh_token: Option<&RefreshToken>) -> Termination {
        let not_attempted = Termination {
            revocation_attempted: false,
            revocation_error: None,
        };
        let Some(refresh_token) = refresh_token else {
            return not_attempted;
        };

        let id = match self.token_codec.verify(&refresh_token.0, self.clock.now()) {
            Verification::Valid(claims) | Verification::ExpiredOnly(claims) => claims.id,
            Verification::Invalid(reason) => {
                debug!(%reason, "unreadable refresh token on logout, nothing to revoke");
                return not_attempted;
            }
        };

        let revocation_error = match self.revocation_gate.revoke(&id).await {
            Ok(()) => {
                debug!(session = %id, "session revoked");
                None
            }
            Err(e) => {
                warn!(session = %id, error = %e, "revocation failed during logout");
                Some(e)
            }
        };
        Termination {
            revocation_attempted: true,
            revocation_error,
        }
    }

    fn read_claims(&self, auth_token: &AuthToken) -> Result<Claims, SessionError> {
        match self.token_codec.verify(&auth_token.0, self.clock.now()) {
            Verification::Valid(claims) => Ok(claims),
            Verification::ExpiredOnly(_) => Err(Denial::AuthTokenExpired.into()),
            Verification::Invalid(_) => Err(Denial::InvalidAuthToken.into()),
        }
    }
}
