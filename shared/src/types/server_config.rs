use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable that overrides `auth.secret_key`.
pub const SECRET_KEY_ENV: &str = "SECURITY_SECRET_KEY";

/// Smallest HMAC key accepted, in decoded bytes (HS256 needs 256 bits).
pub const MIN_SECRET_KEY_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    /// Base64-encoded HMAC key used to sign and verify session tokens.
    ///
    /// Prefer loading this via the `SECURITY_SECRET_KEY` environment
    /// variable.  This field is the fallback for deployments that cannot
    /// inject env vars.
    ///
    /// **Minimum length:** 32 bytes once decoded.
    pub secret_key: Option<String>,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:8080"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AuthConfig {
    /// Resolve the secret with `SECURITY_SECRET_KEY` taking priority over
    /// the config file field.
    ///
    /// Returns `None` when neither source is set (startup treats this as a
    /// hard error).
    pub fn resolved_secret_key(&self) -> Option<String> {
        self.resolve_secret_key_from(std::env::var(SECRET_KEY_ENV).ok())
    }

    pub fn resolve_secret_key_from(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.secret_key.clone())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Decode the resolved secret into raw key bytes.
    pub fn decoded_secret_key(&self) -> Result<Vec<u8>, ConfigError> {
        let secret = self.resolved_secret_key().ok_or_else(|| {
            ConfigError::InvalidConfig(format!(
                "secret_key must be set via the {} env var or auth.secret_key config field",
                SECRET_KEY_ENV
            ))
        })?;
        decode_secret_key(&secret)
    }
}

/// Decode a base64 secret and enforce the minimum HMAC key size.
pub fn decode_secret_key(secret: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = STANDARD
        .decode(secret.trim())
        .map_err(|e| ConfigError::InvalidConfig(format!("secret_key is not valid base64: {}", e)))?;

    if bytes.len() < MIN_SECRET_KEY_BYTES {
        return Err(ConfigError::InvalidConfig(format!(
            "secret_key must decode to at least {} bytes, got {}",
            MIN_SECRET_KEY_BYTES,
            bytes.len()
        )));
    }

    Ok(bytes)
}

// The key itself must never reach a log line.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_database_url() -> String {
    "sqlite://auth.db".to_string()
}

pub fn default_max_connections() -> u32 {
    5
}

/// Three days.
pub fn default_token_ttl() -> u64 {
    3 * 24 * 60 * 60
}

pub fn default_log_level() -> String {
    "info".to_string()
}
