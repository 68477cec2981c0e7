use anyhow::{Context, Result};
use bytes::Bytes;
use hyper::{Request, StatusCode};
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::handlers::http::utils::{HttpResponse, deliver_serialized_json};

/// `POST /api/auth/logout`: clears the cookie, nothing else.
///
/// Tokens are not tracked server-side, so a copy of the old token stays valid
/// until it expires.
pub async fn handle_logout(_req: Request<Bytes>, state: AppState) -> Result<HttpResponse> {
    let mut response = deliver_serialized_json(
        &json!({"status": "success", "message": "Logged out"}),
        StatusCode::OK,
    )?;
    state
        .transport
        .clear(response.headers_mut())
        .context("Failed to clear session cookie")?;

    info!("Session cookie cleared");
    Ok(response)
}
