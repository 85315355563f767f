use crate::domain_model::CsrfSecret;

#[derive(Debug, thiserror::Error)]
#[error("randomness source failed: {0}")]
pub struct SecretError(pub String);

pub trait SecretGenerator: Send + Sync {
    fn generate(&self) -> Result<CsrfSecret, SecretError>;
}
