use super::KeyMaterial;
use crate::domain_model::Claims;
use crate::domain_port::{CodecError, TokenCodec, Verification};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Header, Validation, decode, encode};

/// JWT codec for one configured algorithm.
pub struct JwtCodec {
    keys: KeyMaterial,
    validation: Validation,
}

impl JwtCodec {
    pub fn new(keys: KeyMaterial) -> Self {
        // Expiry is judged separately so an expired token still yields its claims.
        let mut validation = Validation::new(keys.algorithm());
        validation.validate_exp = false;
        validation.leeway = 0;
        JwtCodec { keys, validation }
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }
}

impl TokenCodec for JwtCodec {
    fn sign(&self, claims: &Claims) -> Result<String, CodecError> {
        let key = self.keys.encoding_key().ok_or(CodecError::NoSigningKey)?;
        Ok(encode(&Header::new(self.keys.algorithm()), claims, key)?)
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Verification {
        match decode::<Claims>(token, self.keys.decoding_key(), &self.validation) {
            Ok(data) if data.claims.is_expired_at(now) => Verification::ExpiredOnly(data.claims),
            Ok(data) => Verification::Valid(data.claims),
            Err(e) => Verification::Invalid(e.to_string()),
        }
    }

    fn can_sign(&self) -> bool {
        self.keys.can_sign()
    }
}
