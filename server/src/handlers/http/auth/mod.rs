pub mod login;
pub mod logout;
pub mod me;
pub mod register;

pub use login::handle_login;
pub use logout::handle_logout;
pub use me::handle_me;
pub use register::handle_register;

use anyhow::{Context, Result};
use hyper::StatusCode;

use shared::types::SessionResponse;

use crate::AppState;
use crate::auth::{AuthError, AuthSession};
use crate::handlers::http::utils::{HttpResponse, deliver_serialized_json};

/// Body carries the user, never the token; the token rides in the cookie.
fn deliver_session(
    state: &AppState,
    session: AuthSession,
    status: StatusCode,
    message: &str,
) -> Result<HttpResponse> {
    let body = SessionResponse::Success {
        user: session.user,
        expires_in: state.tokens.ttl().as_secs(),
        message: message.to_string(),
    };

    let mut response =
        deliver_serialized_json(&body, status).context("Failed to build session response")?;
    state
        .transport
        .attach(response.headers_mut(), &session.token)
        .context("Failed to attach session cookie")?;
    Ok(response)
}

fn deliver_session_error(err: &AuthError) -> Result<HttpResponse> {
    deliver_serialized_json(&err.to_response(), err.status())
}

fn deliver_bad_request(code: &str, message: impl Into<String>) -> Result<HttpResponse> {
    deliver_serialized_json(&SessionResponse::error(code, message), StatusCode::BAD_REQUEST)
}
