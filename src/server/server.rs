use crate::api::v1::{FailureResponder, PlainFailureResponder, SessionGuard, TransportConfig};
use crate::application_impl::*;
use crate::application_port::SessionService;
use crate::domain_port::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{Demo, Settings};
use std::sync::Arc;

pub struct Server {
    pub guard: Arc<SessionGuard>,
    pub demo: Arc<Demo>,
    pub responder: Arc<dyn FailureResponder>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let keys = KeyMaterial::from_settings(&settings.auth)?;
        info!(?keys, "key material loaded");
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtCodec::new(keys));
        let secret_generator: Arc<dyn SecretGenerator> = Arc::new(OsRngSecretGenerator::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let session_config = SessionConfig::from_settings(&settings.auth)?;
        let revocation_gate: Arc<dyn RevocationGate> = match settings.revocation.backend.as_str() {
            "none" => Arc::new(AllowAllRevocationGate),
            "memory" => Arc::new(MemoryRevocationGate::new(clock.clone())),
            "redis" => {
                let url = settings
                    .revocation
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("revocation.redis_url is required for the redis backend"))?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                // A revoked id only matters while a token carrying it can still verify.
                let retention = session_config.refresh_token_ttl + session_config.auth_token_ttl;
                Arc::new(RedisRevocationGate::new(
                    redis_manager,
                    settings.revocation.prefix.clone(),
                    retention,
                ))
            }
            other => {
                return Err(anyhow::anyhow!("unknown revocation backend: {:?}", other));
            }
        };
        info!(backend = %settings.revocation.backend, "revocation gate ready");

        let session_service: Arc<dyn SessionService> = Arc::new(SessionManager::new(
            session_config,
            token_codec,
            secret_generator,
            revocation_gate,
            clock.clone(),
        )?);

        let guard = SessionGuard::new(
            session_service,
            TransportConfig::from_settings(&settings.auth),
            clock,
        );

        Ok(Server {
            guard: Arc::new(guard),
            demo: Arc::new(settings.demo.clone()),
            responder: Arc::new(PlainFailureResponder),
        })
    }
}
