use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Method, Request, StatusCode};
use tracing::{debug, warn};

use crate::AppState;
use crate::auth::{AuthPayload, Permissions, Requirement, Role};
use crate::handlers::http::utils::*;
use crate::handlers::http::{auth, users};

/// Largest request body the router will collect.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two tiers:
//
//   OpenHandler     no auth.  Receives (req, state).
//                     Use for: login, register, logout, health.
//
//   GuardedHandler  the router runs the Authorization Gate against the
//                     route's Requirement first.  Receives (req, state,
//                     identity).  Handlers never re-run the gate.

type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send>>;

type OpenHandler = Box<dyn Fn(Request<Bytes>, AppState) -> HandlerFuture + Send + Sync>;

type GuardedHandler =
    Box<dyn Fn(Request<Bytes>, AppState, AuthPayload) -> HandlerFuture + Send + Sync>;

enum RouteKind {
    Open(OpenHandler),
    Guarded(Requirement, GuardedHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
    max_body_bytes: usize,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn open<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    fn guarded<F, Fut>(mut self, method: Method, path: &str, requirement: Requirement, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, AuthPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Guarded(
                requirement,
                Box::new(move |req, state, identity| Box::pin(handler(req, state, identity))),
            ),
        });
        self
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.open(Method::GET, path, handler)
    }

    /// POST with no authentication: login, register and logout only.
    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.open(Method::POST, path, handler)
    }

    // ── Guarded (Authorization Gate runs first) ──────────────────────────────

    pub fn get_guarded<F, Fut>(self, path: &str, requirement: Requirement, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, AuthPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.guarded(Method::GET, path, requirement, handler)
    }

    pub fn post_guarded<F, Fut>(self, path: &str, requirement: Requirement, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, AuthPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.guarded(Method::POST, path, requirement, handler)
    }

    pub fn put_guarded<F, Fut>(self, path: &str, requirement: Requirement, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, AuthPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.guarded(Method::PUT, path, requirement, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Match, authorize, collect the body, then call the handler.
    ///
    /// Authorization looks only at headers, so a rejected request never has
    /// its body read.
    pub async fn route<B>(&self, req: Request<B>, state: AppState) -> Result<HttpResponse>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(route) = self
            .routes
            .iter()
            .find(|r| r.method == method && Self::path_matches(&r.path, &path))
        else {
            debug!("No route for {} {}", method, path);
            return not_found("Endpoint not found").context("Failed to deliver 404 response");
        };

        let identity = match &route.kind {
            RouteKind::Open(_) => None,
            RouteKind::Guarded(requirement, _) => {
                match state.gate.authorize(req.headers(), requirement) {
                    Ok(identity) => Some(identity),
                    Err(e) => {
                        debug!("Rejected {} {}: {}", method, path, e);
                        return deliver_auth_error(&e).context("Failed to deliver auth failure");
                    }
                }
            }
        };

        let (mut parts, body) = req.into_parts();
        let bytes = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                warn!("Body too large on {} {}", method, path);
                return deliver_error_json(
                    "PAYLOAD_TOO_LARGE",
                    "Request body too large",
                    StatusCode::PAYLOAD_TOO_LARGE,
                )
                .context("Failed to deliver 413 response");
            }
            Err(e) => {
                warn!("Failed to read body on {} {}: {}", method, path, e);
                return bad_request("INVALID_REQUEST", "Could not read request body")
                    .context("Failed to deliver 400 response");
            }
        };

        parts.extensions.insert(PathParams::capture(&route.path, &path));
        let req = Request::from_parts(parts, bytes);

        match (&route.kind, identity) {
            (RouteKind::Open(h), _) => h(req, state).await,
            (RouteKind::Guarded(_, h), Some(identity)) => h(req, state, identity).await,
            (RouteKind::Guarded(..), None) => {
                deliver_auth_error(&crate::auth::AuthError::Unauthenticated)
            }
        }
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/users/:id"  matches  "/api/users/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| (r.starts_with(':') && !p.is_empty()) || r == p)
    }
}

// ---------------------------------------------------------------------------
// API router
//
// Auth is enforced here at the routing level; handlers MUST NOT repeat the
// gate call.  The contract is:
//
//   .get(...) / .post(...)     → Open,    handler gets (req, state)
//   .*_guarded(path, req, ..)  → Guarded, handler gets (req, state, identity)
//
// Self-scoping ("own record unless elevated") is the one check handlers do
// themselves, because only they know the resource owner.
// ---------------------------------------------------------------------------

pub fn build_api_router() -> Router {
    Router::new()
        // ── Public ───────────────────────────────────────────────────────────
        .get("/health", |_req, _state| async move {
            deliver_serialized_json(
                &serde_json::json!({"status": "success", "health": "ok"}),
                StatusCode::OK,
            )
        })
        .post("/api/auth/login", |req, state| async move {
            auth::handle_login(req, state).await.context("Login failed")
        })
        .post("/api/auth/register", |req, state| async move {
            auth::handle_register(req, state)
                .await
                .context("Registration failed")
        })
        .post("/api/auth/logout", |req, state| async move {
            auth::handle_logout(req, state).await.context("Logout failed")
        })
        // ── Any valid session ────────────────────────────────────────────────
        .get_guarded(
            "/api/auth/me",
            Requirement::Authenticated,
            |req, state, identity| async move {
                auth::handle_me(req, state, identity)
                    .await
                    .context("Current user lookup failed")
            },
        )
        // ── Users ────────────────────────────────────────────────────────────
        .get_guarded(
            "/api/users/by-email/:email",
            Requirement::moderator_or_admin(),
            |req, state, identity| async move {
                users::handle_get_user_by_email(req, state, identity)
                    .await
                    .context("User lookup by email failed")
            },
        )
        .get_guarded(
            "/api/users/:id",
            Requirement::permission(Permissions::USER_READ),
            |req, state, identity| async move {
                users::handle_get_user(req, state, identity)
                    .await
                    .context("User lookup failed")
            },
        )
        .put_guarded(
            "/api/users/:id/roles",
            Requirement::permission(Permissions::USER_UPDATE),
            |req, state, identity| async move {
                users::handle_update_roles(req, state, identity)
                    .await
                    .context("Role update failed")
            },
        )
        .post_guarded(
            "/api/users/:id/deactivate",
            Requirement::role(Role::Admin),
            |req, state, identity| async move {
                users::handle_deactivate(req, state, identity)
                    .await
                    .context("Deactivation failed")
            },
        )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
