use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Revocation list in Redis: one `prefix:id` key per revoked session.
pub struct RedisRevocationGate {
    conn: ConnectionManager,
    prefix: String,
    retention_secs: u64,
}

impl RedisRevocationGate {
    /// `retention` must cover the longest a token of a revoked session can
    /// still be presented: refresh TTL plus auth TTL.
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, retention: Duration) -> Self {
        RedisRevocationGate {
            conn,
            prefix: prefix.into(),
            retention_secs: retention_secs(retention),
        }
    }

    fn key(&self, id: &SessionId) -> String {
        revocation_key(&self.prefix, id)
    }
}

fn revocation_key(prefix: &str, id: &SessionId) -> String {
    format!("{}:{}", prefix, id)
}

// SET EX refuses a zero expiry.
fn retention_secs(retention: Duration) -> u64 {
    retention.as_secs().max(1)
}

#[async_trait::async_trait]
impl RevocationGate for RedisRevocationGate {
    async fn is_valid(&self, id: &SessionId) -> Result<bool, RevocationError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let revoked: bool = conn
            .exists(&key)
            .await
            .map_err(|e| RevocationError::Store(e.to_string()))?;
        Ok(!revoked)
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), RevocationError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, 1u8, self.retention_secs)
            .await
            .map_err(|e| RevocationError::Store(e.to_string()))?;
        Ok(())
    }
}
