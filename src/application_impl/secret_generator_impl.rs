use crate::domain_model::CsrfSecret;
use crate::domain_port::{SecretError, SecretGenerator};
use rand::RngCore;
use rand::rngs::OsRng;

pub const CSRF_SECRET_BYTES: usize = 32;

/// Hex-encoded secrets drawn from the OS randomness source.
pub struct OsRngSecretGenerator {
    byte_length: usize,
}

impl OsRngSecretGenerator {
    pub fn new(byte_length: usize) -> Self {
        Self { byte_length }
    }
}

impl Default for OsRngSecretGenerator {
    fn default() -> Self {
        Self::new(CSRF_SECRET_BYTES)
    }
}

impl SecretGenerator for OsRngSecretGenerator {
    fn generate(&self) -> Result<CsrfSecret, SecretError> {
        let mut bytes = vec![0u8; self.byte_length];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SecretError(e.to_string()))?;
        Ok(CsrfSecret(hex::encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_fixed_length_and_distinct() {
        let generator = OsRngSecretGenerator::default();
        let first = generator.generate().unwrap();
        let second = generator.generate().unwrap();

        assert_eq!(first.as_str().len(), CSRF_SECRET_BYTES * 2);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
