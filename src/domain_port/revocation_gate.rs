use crate::domain_model::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("store error: {0}")]
    Store(String),
}

/// Caller-owned revocation store, keyed by session id.
///
/// Implementations are called concurrently from many requests and own their
/// synchronization.
#[async_trait::async_trait]
pub trait RevocationGate: Send + Sync {
    /// `true` unless the session has been explicitly revoked.
    async fn is_valid(&self, id: &SessionId) -> Result<bool, RevocationError>;
    /// Best-effort.
    async fn revoke(&self, id: &SessionId) -> Result<(), RevocationError>;
}
