//! Signed, time-bound session tokens.
//!
//! Tokens are HS256 JWTs over [`TokenClaims`]. Verification collapses every
//! failure (bad structure, bad signature, expired) into `None`; the reason is
//! logged at `debug` and never handed to the caller.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::{debug, warn};

use shared::types::{SigningSecret, TokenClaims};

use crate::auth::evaluator::compute_mask;
use crate::auth::permissions::Permissions;
use crate::auth::roles::{Role, role_names};

/// 24 hours.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock source, injectable so expiry can be tested without sleeping.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Identity carried inside a verified token.
///
/// Immutable once issued: a role change needs a new token at the next login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPayload {
    pub subject_id: i64,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthPayload {
    pub fn new(subject_id: i64, email: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            subject_id,
            email: email.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// True when this identity is the owner `id`.
    pub fn is_subject(&self, id: i64) -> bool {
        self.subject_id == id
    }

    /// Effective permission mask across every held role.
    pub fn permissions(&self) -> Permissions {
        compute_mask(&self.roles)
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &SigningSecret, ttl: Duration) -> Self {
        Self::with_clock(secret, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &SigningSecret, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        // Expiry is checked against our own clock below, not the library's,
        // so that the boundary is exact and testable.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `payload` with a fresh issued-at and `now + ttl` expiry.
    pub fn issue(&self, payload: &AuthPayload) -> Result<String, TokenError> {
        let iat = self.clock.now_secs();
        let claims = TokenClaims {
            sub: payload.subject_id,
            email: payload.email.clone(),
            roles: role_names(&payload.roles),
            iat,
            exp: iat.saturating_add(self.ttl.as_secs()),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = payload.subject_id, exp = claims.exp, "Issued session token");
        Ok(token)
    }

    /// Check signature and expiry. Any failure is `None`.
    ///
    /// Role names are re-validated after the signature check; anything that is
    /// not an exact role name (case included) becomes [`Role::LOWEST`].
    pub fn verify(&self, token: &str) -> Option<AuthPayload> {
        let claims = match jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Token rejected: {}", e);
                return None;
            }
        };

        let now = self.clock.now_secs();
        if now >= claims.exp {
            debug!(user_id = claims.sub, exp = claims.exp, now, "Token rejected: expired");
            return None;
        }

        let roles = claims
            .roles
            .iter()
            .map(|name| {
                Role::from_claim(name).unwrap_or_else(|| {
                    warn!(
                        user_id = claims.sub,
                        role = %name,
                        "Unrecognised role in signed token, coercing to {}",
                        Role::LOWEST
                    );
                    Role::LOWEST
                })
            })
            .collect();

        Some(AuthPayload {
            subject_id: claims.sub,
            email: claims.email,
            roles,
        })
    }
}
