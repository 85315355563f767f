use crate::settings;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("signing algorithm not recognized: {0:?}")]
    UnknownAlgorithm(String),
    #[error("{algorithm:?} is not a {expected:?} algorithm")]
    FamilyMismatch {
        algorithm: Algorithm,
        expected: KeyFamily,
    },
    #[error("an HMAC-SHA signing algorithm requires a non-empty hmac key")]
    MissingHmacKey,
    #[error("{0} key location is required")]
    MissingKeyLocation(&'static str),
    #[error("cannot read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
    #[error("private and public key do not form a usable pair: {0}")]
    KeyPairMismatch(jsonwebtoken::errors::Error),
    #[error("server issues tokens but holds no signing key")]
    SigningKeyRequired,
    #[error("{0} token lifetime is out of range")]
    TtlOutOfRange(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Hmac,
    Rsa,
    Ecdsa,
}

/// Maps a configured algorithm identifier to its `jsonwebtoken` algorithm.
pub fn parse_algorithm(name: &str) -> Result<(Algorithm, KeyFamily), ConfigurationError> {
    let parsed = match name {
        "HS256" => (Algorithm::HS256, KeyFamily::Hmac),
        "HS384" => (Algorithm::HS384, KeyFamily::Hmac),
        "HS512" => (Algorithm::HS512, KeyFamily::Hmac),
        "RS256" => (Algorithm::RS256, KeyFamily::Rsa),
        "RS384" => (Algorithm::RS384, KeyFamily::Rsa),
        "RS512" => (Algorithm::RS512, KeyFamily::Rsa),
        "ES256" => (Algorithm::ES256, KeyFamily::Ecdsa),
        "ES384" => (Algorithm::ES384, KeyFamily::Ecdsa),
        other => return Err(ConfigurationError::UnknownAlgorithm(other.to_string())),
    };
    Ok(parsed)
}

pub enum SigningKey {
    Symmetric(EncodingKey),
    AsymmetricPrivate(EncodingKey),
    None,
}

pub enum VerifyingKey {
    Symmetric(DecodingKey),
    AsymmetricPublic(DecodingKey),
}

/// Signing and verification keys for one algorithm. Immutable once built.
pub struct KeyMaterial {
    algorithm: Algorithm,
    family: KeyFamily,
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyMaterial {
    /// Shared-secret keys. A verify-only server keeps no signing key.
    pub fn hmac(
        algorithm: &str,
        secret: &[u8],
        verify_only: bool,
    ) -> Result<Self, ConfigurationError> {
        let (algorithm, family) = parse_algorithm(algorithm)?;
        if family != KeyFamily::Hmac {
            return Err(ConfigurationError::FamilyMismatch {
                algorithm,
                expected: KeyFamily::Hmac,
            });
        }
        if secret.is_empty() {
            return Err(ConfigurationError::MissingHmacKey);
        }

        let signing = if verify_only {
            SigningKey::None
        } else {
            SigningKey::Symmetric(EncodingKey::from_secret(secret))
        };
        Ok(KeyMaterial {
            algorithm,
            family,
            signing,
            verifying: VerifyingKey::Symmetric(DecodingKey::from_secret(secret)),
        })
    }

    /// RSA or ECDSA keys from PEM. Without a private key the material is verify-only.
    pub fn from_pem(
        algorithm: &str,
        private_pem: Option<&[u8]>,
        public_pem: &[u8],
    ) -> Result<Self, ConfigurationError> {
        let (algorithm, family) = parse_algorithm(algorithm)?;
        let (signing, verifying) = match family {
            KeyFamily::Rsa => (
                private_pem
                    .map(EncodingKey::from_rsa_pem)
                    .transpose()?
                    .map_or(SigningKey::None, SigningKey::AsymmetricPrivate),
                VerifyingKey::AsymmetricPublic(DecodingKey::from_rsa_pem(public_pem)?),
            ),
            KeyFamily::Ecdsa => (
                private_pem
                    .map(EncodingKey::from_ec_pem)
                    .transpose()?
                    .map_or(SigningKey::None, SigningKey::AsymmetricPrivate),
                VerifyingKey::AsymmetricPublic(DecodingKey::from_ec_pem(public_pem)?),
            ),
            KeyFamily::Hmac => {
                return Err(ConfigurationError::FamilyMismatch {
                    algorithm,
                    expected: KeyFamily::Rsa,
                });
            }
        };

        let material = KeyMaterial {
            algorithm,
            family,
            signing,
            verifying,
        };
        material.check_pair()?;
        Ok(material)
    }

    /// Builds key material from the `auth` settings, reading PEM files once.
    pub fn from_settings(auth: &settings::Auth) -> Result<Self, ConfigurationError> {
        let (_, family) = parse_algorithm(&auth.signing_algorithm)?;
        if family == KeyFamily::Hmac {
            let secret = auth.hmac_key.as_deref().unwrap_or_default();
            return Self::hmac(&auth.signing_algorithm, secret.as_bytes(), auth.verify_only);
        }

        let public_path = non_empty(auth.public_key_path.as_deref())
            .ok_or(ConfigurationError::MissingKeyLocation("public"))?;
        let private_pem = if auth.verify_only {
            None
        } else {
            let private_path = non_empty(auth.private_key_path.as_deref())
                .ok_or(ConfigurationError::MissingKeyLocation("private"))?;
            Some(read_key_file(private_path)?)
        };
        let public_pem = read_key_file(public_path)?;

        Self::from_pem(&auth.signing_algorithm, private_pem.as_deref(), &public_pem)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub fn encoding_key(&self) -> Option<&EncodingKey> {
        match &self.signing {
            SigningKey::Symmetric(key) | SigningKey::AsymmetricPrivate(key) => Some(key),
            SigningKey::None => None,
        }
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        match &self.verifying {
            VerifyingKey::Symmetric(key) | VerifyingKey::AsymmetricPublic(key) => key,
        }
    }

    pub fn can_sign(&self) -> bool {
        self.encoding_key().is_some()
    }

    // Signs and verifies a throwaway token so a curve or pair mismatch fails at startup.
    fn check_pair(&self) -> Result<(), ConfigurationError> {
        let Some(encoding_key) = self.encoding_key() else {
            return Ok(());
        };
        let sample = serde_json::json!({ "check": true });
        let token = encode(&Header::new(self.algorithm), &sample, encoding_key)
            .map_err(ConfigurationError::KeyPairMismatch)?;

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<serde_json::Value>(&token, self.decoding_key(), &validation)
            .map_err(ConfigurationError::KeyPairMismatch)?;
        Ok(())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("family", &self.family)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_key_file(path: &str) -> Result<Vec<u8>, ConfigurationError> {
    std::fs::read(path).map_err(|source| ConfigurationError::KeyFile {
        path: path.to_string(),
        source,
    })
}
