#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use countersign::application_impl::*;
use countersign::domain_model::{CsrfSecret, SessionId};
use countersign::domain_port::*;
use dashmap::DashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const HMAC_KEY: &[u8] = b"My super secret key!";

pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Revocation store that counts calls and can be told to fail.
#[derive(Default)]
pub struct RecordingGate {
    revoked: DashSet<SessionId>,
    pub is_valid_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub fail_is_valid: AtomicBool,
    pub fail_revoke: AtomicBool,
}

impl RecordingGate {
    pub fn is_valid_calls(&self) -> usize {
        self.is_valid_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn is_revoked(&self, id: &SessionId) -> bool {
        self.revoked.contains(id)
    }
}

#[async_trait::async_trait]
impl RevocationGate for RecordingGate {
    async fn is_valid(&self, id: &SessionId) -> Result<bool, RevocationError> {
        self.is_valid_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_is_valid.load(Ordering::SeqCst) {
            return Err(RevocationError::Store("connection refused".to_string()));
        }
        Ok(!self.revoked.contains(id))
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), RevocationError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(RevocationError::Store("connection refused".to_string()));
        }
        self.revoked.insert(id.clone());
        Ok(())
    }
}

/// Hands out `secret-1`, `secret-2`, ... so rotations are easy to follow.
/// Setting `exhausted` makes every later call fail like a dead entropy source.
#[derive(Default)]
pub struct SequentialSecrets {
    issued: AtomicUsize,
    pub exhausted: AtomicBool,
}

impl SecretGenerator for SequentialSecrets {
    fn generate(&self) -> Result<CsrfSecret, SecretError> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(SecretError("exhausted".to_string()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CsrfSecret(format!("secret-{n}")))
    }
}

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub gate: Arc<RecordingGate>,
    pub secrets: Arc<SequentialSecrets>,
    pub codec: Arc<JwtCodec>,
    pub manager: SessionManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let keys = KeyMaterial::hmac("HS256", HMAC_KEY, false).unwrap();
        Self::build(config, keys)
    }

    pub fn build(config: SessionConfig, keys: KeyMaterial) -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let gate = Arc::new(RecordingGate::default());
        let secrets = Arc::new(SequentialSecrets::default());
        let codec = Arc::new(JwtCodec::new(keys));
        let manager = SessionManager::new(
            config,
            codec.clone(),
            secrets.clone(),
            gate.clone(),
            clock.clone(),
        )
        .unwrap();
        Fixture {
            clock,
            gate,
            secrets,
            codec,
            manager,
        }
    }

    /// Past the default auth token lifetime, well inside the refresh lifetime.
    pub fn expire_auth_token(&self) {
        self.clock.advance(Duration::minutes(16));
    }
}
