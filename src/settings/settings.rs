use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    #[serde(default)]
    pub revocation: Revocation,
    pub http: Http,
    pub log: Log,
    #[serde(default)]
    pub demo: Demo,
}

#[derive(Deserialize)]
pub struct Auth {
    pub signing_algorithm: String, // "HS256" | "RS384" | "ES256" ...
    #[serde(default)]
    pub hmac_key: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub public_key_path: Option<String>,
    #[serde(default)]
    pub verify_only: bool,
    #[serde(default)]
    pub bearer_tokens: bool,
    #[serde(default)]
    pub refresh_token_ttl_secs: u64, // 0 = 72h
    #[serde(default)]
    pub auth_token_ttl_secs: u64, // 0 = 15min
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dev_env: bool,
}

// Keeps the hmac key out of logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("signing_algorithm", &self.signing_algorithm)
            .field("hmac_key", &self.hmac_key.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("verify_only", &self.verify_only)
            .field("bearer_tokens", &self.bearer_tokens)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("auth_token_ttl_secs", &self.auth_token_ttl_secs)
            .field("debug", &self.debug)
            .field("dev_env", &self.dev_env)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Revocation {
    pub backend: String, // "none", "memory" or "redis"
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_revocation_prefix")]
    pub prefix: String,
}

impl Default for Revocation {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            redis_url: None,
            prefix: default_revocation_prefix(),
        }
    }
}

fn default_revocation_prefix() -> String {
    "revoked".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

/// Credentials accepted by the demo login route.
#[derive(Debug, Clone, Deserialize)]
pub struct Demo {
    pub username: String,
    pub password: String,
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            username: "testUser".to_string(),
            password: "testPassword".to_string(),
        }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
