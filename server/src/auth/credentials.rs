//! Email + password authentication and self-registration.

use std::sync::Arc;

use tracing::{info, warn};

use shared::types::{PasswordPolicyConfig, RegistrationData, UserInfo};

use crate::auth::error::AuthError;
use crate::auth::password::PasswordHasher;
use crate::auth::roles::Role;
use crate::auth::store::{CredentialRecord, CredentialStore, NewCredential, StoreError};
use crate::auth::token::{AuthPayload, TokenService};

/// Trimmed, lowercase form every lookup and insert uses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Password policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from(&PasswordPolicyConfig::default())
    }
}

impl From<&PasswordPolicyConfig> for PasswordPolicy {
    fn from(cfg: &PasswordPolicyConfig) -> Self {
        Self {
            min_length: cfg.min_length,
            require_uppercase: cfg.require_uppercase,
            require_lowercase: cfg.require_lowercase,
            require_digit: cfg.require_digit,
            require_special: cfg.require_special,
        }
    }
}

impl PasswordPolicy {
    /// First failing rule wins, in the order length, upper, lower, digit,
    /// special.
    pub fn check(&self, password: &str) -> Result<(), AuthError> {
        let violation = |msg: String| Err(AuthError::PasswordPolicyViolation(msg));

        if password.chars().count() < self.min_length {
            return violation(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return violation("Password must contain at least one uppercase letter".into());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return violation("Password must contain at least one lowercase letter".into());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return violation("Password must contain at least one number".into());
        }
        if self.require_special && !password.chars().any(|c| c.is_ascii_punctuation()) {
            return violation("Password must contain at least one special character".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub payload: AuthPayload,
    pub token: String,
    pub user: UserInfo,
}

pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenService>,
    policy: PasswordPolicy,
    /// Digest compared against when the email is unknown, so that path costs
    /// the same hash work as a wrong password.
    decoy_digest: String,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("tokens", &self.tokens)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenService>,
        policy: PasswordPolicy,
    ) -> Self {
        let decoy_digest = hasher.hash("decoy-password-never-matches").unwrap_or_else(|e| {
            warn!("Failed to prepare decoy digest: {}", e);
            String::new()
        });
        Self {
            store,
            hasher,
            tokens,
            policy,
            decoy_digest,
        }
    }

    /// Unknown email, wrong password and deactivated account all come back as
    /// the same `InvalidCredentials`. The real reason is only logged.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        let Some(record) = self.store.find_by_email(&email).await? else {
            self.verify_password(password, &self.decoy_digest).await?;
            warn!(email = %email, "Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &record.password_hash).await? {
            warn!(user_id = record.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !record.is_active {
            warn!(user_id = record.id, "Login failed: account deactivated");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue_session(&record)?;
        info!(user_id = record.id, "User logged in");
        Ok(session)
    }

    /// Create a `user`-role account and log it straight in.
    pub async fn register(&self, details: RegistrationData) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&details.email);

        // Fast path only; the UNIQUE constraint below is what actually holds.
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "Registration rejected: email already in use");
            return Err(AuthError::DuplicateEmail);
        }

        self.policy.check(&details.password)?;

        let password_hash = self.hash_password(details.password).await?;

        let record = self
            .store
            .insert(NewCredential {
                name: details.name.trim().to_string(),
                email,
                password_hash,
                roles: vec![Role::User],
                avatar: details.avatar,
            })
            .await
            .map_err(|e| {
                if e == StoreError::DuplicateEmail {
                    warn!("Registration rejected: email claimed concurrently");
                }
                AuthError::from(e)
            })?;

        let session = self.issue_session(&record)?;
        info!(user_id = record.id, "User registered");
        Ok(session)
    }

    /// Mint a token for an already-authenticated record.
    pub fn issue_session(&self, record: &CredentialRecord) -> Result<AuthSession, AuthError> {
        let payload = AuthPayload::new(record.id, record.email.clone(), record.roles.clone());
        let token = self
            .tokens
            .issue(&payload)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AuthSession {
            payload,
            token,
            user: record.to_user_info(),
        })
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AuthError::Internal(format!("password verify task failed: {}", e)))
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("password hash task failed: {}", e)))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}
