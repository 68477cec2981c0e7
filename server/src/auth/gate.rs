//! Request-time authorization.
//!
//! Nothing here is cached between requests: each call re-reads the cookie,
//! re-verifies the token and re-derives the permission mask.
//!
//! ```text
//! no token               -> Unauthenticated (401)
//! token, fails verify    -> InvalidSession  (401)
//! token ok, check fails  -> Forbidden       (403)
//! token ok, check passes -> proceed
//! check panics / errors  -> Internal        (500)
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use http::HeaderMap;
use tracing::{debug, error, warn};

use crate::auth::error::AuthError;
use crate::auth::evaluator::has_permission;
use crate::auth::permissions::Permissions;
use crate::auth::roles::Role;
use crate::auth::session::SessionTransport;
use crate::auth::token::{AuthPayload, TokenService};

type PredicateFn = dyn Fn(&AuthPayload) -> anyhow::Result<bool> + Send + Sync;

/// What a route demands of its caller, declared at registration.
#[derive(Clone)]
pub enum Requirement {
    /// Any verified session.
    Authenticated,
    /// Every bit in the mask. Admins pass unconditionally.
    Permission(Permissions),
    /// Exact membership; no hierarchy.
    Role(Role),
    /// Compound rules. `name` is what shows up in the audit log.
    Predicate {
        name: &'static str,
        check: Arc<PredicateFn>,
    },
}

impl Requirement {
    pub fn permission(required: Permissions) -> Self {
        Self::Permission(required)
    }

    pub fn role(role: Role) -> Self {
        Self::Role(role)
    }

    pub fn admin() -> Self {
        Self::Role(Role::Admin)
    }

    pub fn moderator_or_admin() -> Self {
        Self::predicate("moderator_or_admin", |identity| {
            Ok(identity.has_role(Role::Moderator) || identity.is_admin())
        })
    }

    pub fn predicate<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&AuthPayload) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::Predicate {
            name,
            check: Arc::new(check),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => f.write_str("authenticated"),
            Self::Permission(p) => write!(f, "permission:{}", p.names().join("|")),
            Self::Role(r) => write!(f, "role:{}", r),
            Self::Predicate { name, .. } => write!(f, "predicate:{}", name),
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Requirement({})", self)
    }
}

/// Decide `requirement` for an already-authenticated identity.
///
/// Pure apart from running a predicate. A predicate that errors or panics is
/// reported as `Internal`, never as a grant.
pub fn check(identity: &AuthPayload, requirement: &Requirement) -> Result<(), AuthError> {
    let allowed = match requirement {
        Requirement::Authenticated => true,
        Requirement::Permission(required) => {
            identity.is_admin() || has_permission(identity.permissions(), *required)
        }
        Requirement::Role(role) => identity.has_role(*role),
        Requirement::Predicate { name, check: predicate } => {
            match catch_unwind(AssertUnwindSafe(|| predicate(identity))) {
                Ok(Ok(allowed)) => allowed,
                Ok(Err(e)) => {
                    return Err(AuthError::Internal(format!("predicate {} failed: {:#}", name, e)));
                }
                Err(_) => {
                    return Err(AuthError::Internal(format!("predicate {} panicked", name)));
                }
            }
        }
    };

    if allowed { Ok(()) } else { Err(AuthError::Forbidden) }
}

/// Owner of the resource, or holder of one of `elevated`.
pub fn owner_or_roles(identity: &AuthPayload, owner_id: i64, elevated: &[Role]) -> bool {
    identity.is_subject(owner_id) || elevated.iter().any(|r| identity.has_role(*r))
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
    transport: SessionTransport,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>, transport: SessionTransport) -> Self {
        Self { tokens, transport }
    }

    /// Resolve the caller from the session cookie.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthPayload, AuthError> {
        let token = self
            .transport
            .extract(headers)
            .ok_or(AuthError::Unauthenticated)?;
        self.tokens.verify(&token).ok_or(AuthError::InvalidSession)
    }

    /// Authenticate, then check. Emits one audit event per call.
    pub fn authorize(
        &self,
        headers: &HeaderMap,
        requirement: &Requirement,
    ) -> Result<AuthPayload, AuthError> {
        let identity = match self.authenticate(headers) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(requirement = %requirement, outcome = e.to_code(), "Authorization denied: {}", e);
                return Err(e);
            }
        };

        match check(&identity, requirement) {
            Ok(()) => {
                debug!(user_id = identity.subject_id, requirement = %requirement, outcome = "allow", "Authorization granted");
                Ok(identity)
            }
            Err(AuthError::Internal(reason)) => {
                error!(user_id = identity.subject_id, requirement = %requirement, outcome = "error", "Authorization failed: {}", reason);
                Err(AuthError::Internal(reason))
            }
            Err(e) => {
                warn!(user_id = identity.subject_id, requirement = %requirement, outcome = e.to_code(), "Authorization denied");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{AUTH_COOKIE, CookieAttributes};
    use crate::auth::token::DEFAULT_TOKEN_TTL;
    use crate::auth::token::tests::ManualClock;
    use http::header::{COOKIE, HeaderValue};
    use shared::types::{Environment, SigningSecret};

    const T0: u64 = 1_700_000_000;

    fn identity(roles: &[Role]) -> AuthPayload {
        AuthPayload::new(1, "a@x.com", roles.to_vec())
    }

    fn gate() -> (AuthGate, Arc<TokenService>, Arc<ManualClock>) {
        let clock = ManualClock::at(T0);
        let tokens = Arc::new(TokenService::with_clock(
            &SigningSecret::new("gate-test-secret-0123456789abcdef"),
            DEFAULT_TOKEN_TTL,
            clock.clone(),
        ));
        let transport = SessionTransport::new(CookieAttributes::for_environment(
            Environment::Development,
            DEFAULT_TOKEN_TTL,
        ));
        (AuthGate::new(tokens.clone(), transport), tokens, clock)
    }

    fn cookie_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", AUTH_COOKIE, token)).unwrap(),
        );
        headers
    }

    #[test]
    fn admin_passes_every_permission() {
        let admin = identity(&[Role::Admin]);
        for p in Permissions::all().iter() {
            assert!(check(&admin, &Requirement::permission(p)).is_ok(), "{:?}", p);
        }
        assert!(check(&admin, &Requirement::permission(Permissions::all())).is_ok());
    }

    #[test]
    fn user_cannot_delete_tasks() {
        let user = identity(&[Role::User]);
        assert_eq!(
            check(&user, &Requirement::permission(Permissions::TASK_DELETE)),
            Err(AuthError::Forbidden)
        );
        assert!(check(&user, &Requirement::permission(Permissions::TASK_READ)).is_ok());
    }

    #[test]
    fn moderator_inherits_user_permissions() {
        let moderator = identity(&[Role::Moderator]);
        assert!(check(&moderator, &Requirement::permission(Permissions::TASK_READ)).is_ok());
        assert!(check(&moderator, &Requirement::permission(Permissions::TASK_DELETE)).is_ok());
        assert!(check(&moderator, &Requirement::permission(Permissions::USER_DELETE)).is_err());
    }

    #[test]
    fn no_roles_fails_closed() {
        let nobody = identity(&[]);
        assert_eq!(
            check(&nobody, &Requirement::permission(Permissions::TASK_READ)),
            Err(AuthError::Forbidden)
        );
        assert!(check(&nobody, &Requirement::Authenticated).is_ok());
    }

    #[test]
    fn role_check_is_exact_membership() {
        let admin = identity(&[Role::Admin]);
        assert_eq!(
            check(&admin, &Requirement::role(Role::Moderator)),
            Err(AuthError::Forbidden)
        );
        assert!(check(&admin, &Requirement::admin()).is_ok());
    }

    #[test]
    fn moderator_or_admin_predicate() {
        let req = Requirement::moderator_or_admin();
        assert!(check(&identity(&[Role::Moderator]), &req).is_ok());
        assert!(check(&identity(&[Role::Admin]), &req).is_ok());
        assert_eq!(check(&identity(&[Role::User]), &req), Err(AuthError::Forbidden));
    }

    #[test]
    fn failing_predicate_is_internal_not_grant() {
        let req = Requirement::predicate("broken", |_| Err(anyhow::anyhow!("lookup failed")));
        assert!(matches!(
            check(&identity(&[Role::Admin]), &req),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn panicking_predicate_is_internal_not_grant() {
        let req = Requirement::predicate("panics", |_| panic!("boom"));
        assert!(matches!(
            check(&identity(&[Role::Admin]), &req),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn owner_or_roles_scopes_to_self() {
        let user = AuthPayload::new(5, "u@x.com", vec![Role::User]);
        assert!(owner_or_roles(&user, 5, &[Role::Moderator, Role::Admin]));
        assert!(!owner_or_roles(&user, 6, &[Role::Moderator, Role::Admin]));

        let moderator = AuthPayload::new(8, "m@x.com", vec![Role::Moderator]);
        assert!(owner_or_roles(&moderator, 6, &[Role::Moderator, Role::Admin]));
        assert!(!owner_or_roles(&moderator, 6, &[Role::Admin]));
    }

    #[test]
    fn missing_cookie_is_unauthenticated() {
        let (gate, _, _) = gate();
        assert_eq!(
            gate.authorize(&HeaderMap::new(), &Requirement::Authenticated),
            Err(AuthError::Unauthenticated)
        );
    }

    #[test]
    fn bad_token_is_invalid_session() {
        let (gate, _, _) = gate();
        assert_eq!(
            gate.authorize(&cookie_headers("garbage"), &Requirement::Authenticated),
            Err(AuthError::InvalidSession)
        );
    }

    #[test]
    fn expired_token_is_invalid_session() {
        let (gate, tokens, clock) = gate();
        let token = tokens.issue(&identity(&[Role::Admin])).unwrap();
        clock.set(T0 + DEFAULT_TOKEN_TTL.as_secs() + 1);
        assert_eq!(
            gate.authorize(&cookie_headers(&token), &Requirement::admin()),
            Err(AuthError::InvalidSession)
        );
    }

    #[test]
    fn valid_token_yields_identity() {
        let (gate, tokens, _) = gate();
        let token = tokens.issue(&identity(&[Role::User])).unwrap();
        let who = gate
            .authorize(
                &cookie_headers(&token),
                &Requirement::permission(Permissions::TASK_CREATE),
            )
            .unwrap();
        assert_eq!(who.email, "a@x.com");
    }

    #[test]
    fn valid_token_without_privilege_is_forbidden() {
        let (gate, tokens, _) = gate();
        let token = tokens.issue(&identity(&[Role::User])).unwrap();
        assert_eq!(
            gate.authorize(&cookie_headers(&token), &Requirement::admin()),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn requirement_display_is_readable() {
        assert_eq!(Requirement::admin().to_string(), "role:admin");
        assert_eq!(
            Requirement::permission(Permissions::USER_READ).to_string(),
            "permission:USER_READ"
        );
        assert_eq!(
            Requirement::moderator_or_admin().to_string(),
            "predicate:moderator_or_admin"
        );
    }
}
