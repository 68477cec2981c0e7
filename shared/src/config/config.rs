use std::fs;
use tracing::{debug, error, info};

use crate::types::server_config::{
    AppConfig, ConfigError, MAX_TOKEN_EXPIRY_MINUTES, MIN_SECRET_LEN,
};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.auth.token_expiry_minutes == 0 {
        return Err(ConfigError::InvalidConfig(
            "token_expiry_minutes must be greater than 0".into(),
        ));
    }

    if config.auth.token_expiry_minutes > MAX_TOKEN_EXPIRY_MINUTES {
        return Err(ConfigError::InvalidConfig(format!(
            "token_expiry_minutes must be at most {} (30 days)",
            MAX_TOKEN_EXPIRY_MINUTES
        )));
    }

    if config.server.max_connections == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_connections must be greater than 0".into(),
        ));
    }

    if config.auth.password_policy.min_length == 0 {
        return Err(ConfigError::InvalidConfig(
            "password_policy.min_length must be greater than 0".into(),
        ));
    }

    if config.database.url.trim().is_empty() {
        return Err(ConfigError::InvalidConfig("database.url cannot be empty".into()));
    }

    // A production deployment without a strong secret is rejected here, at
    // load time, rather than at the first login. The development fallback is
    // resolved (and shouted about) when the token service is built.
    if config.server.environment().is_production() {
        match config.auth.resolved_jwt_secret() {
            None => {
                return Err(ConfigError::InvalidConfig(
                    "jwt_secret must be set via the JWT_SECRET env var or auth.jwt_secret config field"
                        .into(),
                ));
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::InvalidConfig(format!(
                    "jwt_secret must be at least {} characters long",
                    MIN_SECRET_LEN
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
