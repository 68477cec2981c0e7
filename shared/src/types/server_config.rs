use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::error;

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
// Constants
// ---------------------------------------------------------------------------

/// Shortest signing secret accepted in production, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest session accepted in config: 30 days.
pub const MAX_TOKEN_EXPIRY_MINUTES: u64 = 30 * 24 * 60;

/// Publicly known secret used only when a development build has nothing
/// configured. Anyone can forge tokens against it.
const DEV_FALLBACK_SECRET: &str = "insecure-development-secret-do-not-deploy";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

/// Registration-time password rules. Defaults match what the service has
/// always enforced: 8+ characters with upper, lower and a digit.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PasswordPolicyConfig {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    #[serde(default = "default_true")]
    pub require_digit: bool,
    #[serde(default)]
    pub require_special: bool,
}

#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_expiry")]
    pub token_expiry_minutes: u64,
    /// HMAC key used to sign and verify session tokens.
    ///
    /// Prefer loading this via the `JWT_SECRET` environment variable.
    ///
    /// **Minimum length (production):** 32 bytes.
    /// Rotating it invalidates every active session.
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub password_policy: PasswordPolicyConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Resolved HMAC key. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }
}

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:3000"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Environment with `APP_ENV` taking priority over the config file.
    pub fn environment(&self) -> Environment {
        std::env::var("APP_ENV")
            .ok()
            .and_then(|v| Environment::parse(&v))
            .unwrap_or(self.environment)
    }
}

impl AuthConfig {
    /// Token expiry converted to seconds, as used for cookie `Max-Age`.
    /// Saturates rather than wrapping; `validate_config` rejects anything
    /// above [`MAX_TOKEN_EXPIRY_MINUTES`] before this is used.
    pub fn token_expiry_secs(&self) -> u64 {
        self.token_expiry_minutes.saturating_mul(60)
    }

    /// Resolve the signing secret with `JWT_SECRET` env-var taking priority
    /// over the config file field.
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.jwt_secret.clone())
            .filter(|s| !s.is_empty())
    }

    /// The key the token service signs with.
    ///
    /// Production refuses to start without a strong secret. Development falls
    /// back to a well-known key and says so at `error` level every time.
    pub fn signing_secret(&self, env: Environment) -> Result<SigningSecret, ConfigError> {
        match (self.resolved_jwt_secret(), env) {
            (Some(secret), Environment::Production) if secret.len() < MIN_SECRET_LEN => {
                Err(ConfigError::InvalidConfig(format!(
                    "jwt_secret must be at least {} bytes in production",
                    MIN_SECRET_LEN
                )))
            }
            (Some(secret), _) => Ok(SigningSecret(secret)),
            (None, Environment::Production) => Err(ConfigError::InvalidConfig(
                "jwt_secret must be set via the JWT_SECRET env var or auth.jwt_secret in production"
                    .into(),
            )),
            (None, Environment::Development) => {
                error!(
                    "NO SIGNING SECRET CONFIGURED: using the built-in development secret. \
                     Tokens issued by this process can be forged by anyone. \
                     Set JWT_SECRET before exposing this server."
                );
                Ok(SigningSecret(DEV_FALLBACK_SECRET.to_string()))
            }
        }
    }
}

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_dev_fallback(&self) -> bool {
        self.0 == DEV_FALLBACK_SECRET
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_expiry_minutes", &self.token_expiry_minutes)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("password_policy", &self.password_policy)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
            environment: Environment::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_expiry_minutes: default_token_expiry(),
            jwt_secret: None,
            password_policy: PasswordPolicyConfig::default(),
        }
    }
}

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_max_connections() -> usize {
    1000
}

pub fn default_database_url() -> String {
    "sqlite://tasktrack.db?mode=rwc".to_string()
}

/// 24 hours.
pub fn default_token_expiry() -> u64 {
    24 * 60
}

pub fn default_min_length() -> usize {
    8
}

fn default_true() -> bool {
    true
}
