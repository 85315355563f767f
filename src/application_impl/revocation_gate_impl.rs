use crate::domain_model::SessionId;
use crate::domain_port::{Clock, RevocationError, RevocationGate};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Used when the caller supplies no store: nothing is ever revoked.
#[derive(Debug, Default)]
pub struct AllowAllRevocationGate;

#[async_trait::async_trait]
impl RevocationGate for AllowAllRevocationGate {
    async fn is_valid(&self, _id: &SessionId) -> Result<bool, RevocationError> {
        Ok(true)
    }

    async fn revoke(&self, _id: &SessionId) -> Result<(), RevocationError> {
        Ok(())
    }
}

/// In-process revocation list. Entries are kept for the life of the process.
pub struct MemoryRevocationGate {
    revoked: DashMap<SessionId, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl MemoryRevocationGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            revoked: DashMap::new(),
            clock,
        }
    }

    pub fn revoked_at(&self, id: &SessionId) -> Option<DateTime<Utc>> {
        self.revoked.get(id).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[async_trait::async_trait]
impl RevocationGate for MemoryRevocationGate {
    async fn is_valid(&self, id: &SessionId) -> Result<bool, RevocationError> {
        Ok(!self.revoked.contains_key(id))
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), RevocationError> {
        // First revocation time wins.
        let now = self.clock.now();
        self.revoked.entry(id.clone()).or_insert(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::SystemClock;

    #[tokio::test]
    async fn allow_all_never_revokes() {
        let gate = AllowAllRevocationGate;
        let id = SessionId::generate();
        gate.revoke(&id).await.unwrap();
        assert!(gate.is_valid(&id).await.unwrap());
    }

    #[tokio::test]
    async fn memory_gate_revokes_only_the_given_session() {
        let gate = MemoryRevocationGate::new(Arc::new(SystemClock));
        let revoked = SessionId::generate();
        let other = SessionId::generate();

        gate.revoke(&revoked).await.unwrap();

        assert!(!gate.is_valid(&revoked).await.unwrap());
        assert!(gate.is_valid(&other).await.unwrap());
        assert!(gate.revoked_at(&revoked).is_some());
        assert_eq!(gate.len(), 1);
    }

    #[tokio::test]
    async fn memory_gate_tolerates_concurrent_revocations() {
        let gate = Arc::new(MemoryRevocationGate::new(Arc::new(SystemClock)));
        let ids: Vec<SessionId> = (0..64).map(|_| SessionId::generate()).collect();

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    gate.revoke(&id).await.unwrap();
                    gate.revoke(&id).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(gate.len(), ids.len());
        for id in &ids {
            assert!(!gate.is_valid(id).await.unwrap());
        }
    }
}
