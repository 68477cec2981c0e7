//! Task tracker server: cookie sessions and role-gated authorization.

pub mod auth;
pub mod database;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use shared::types::{AppConfig, ConfigError, Environment};

use crate::auth::{
    AuthGate, Clock, CookieAttributes, CredentialStore, CredentialVerifier, PasswordHasher,
    PasswordPolicy, SessionTransport, SystemClock, TokenService,
};

/// Everything a handler can reach. Built once at startup; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub environment: Environment,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub transport: SessionTransport,
    pub gate: AuthGate,
    pub credentials: Arc<CredentialVerifier>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.environment)
            .field("tokens", &self.tokens)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the auth core from config. Fails when the signing secret is
    /// unacceptable for the environment.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, store, hasher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let environment = config.server.environment();
        let secret = config.auth.signing_secret(environment)?;
        let ttl = Duration::from_secs(config.auth.token_expiry_secs());

        let tokens = Arc::new(TokenService::with_clock(&secret, ttl, clock));
        let transport = SessionTransport::new(CookieAttributes::for_environment(environment, ttl));
        let gate = AuthGate::new(Arc::clone(&tokens), transport.clone());
        let credentials = Arc::new(CredentialVerifier::new(
            Arc::clone(&store),
            hasher,
            Arc::clone(&tokens),
            PasswordPolicy::from(&config.auth.password_policy),
        ));

        Ok(Self {
            config: Arc::new(config),
            environment,
            store,
            tokens,
            transport,
            gate,
            credentials,
        })
    }
}
