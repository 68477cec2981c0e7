use anyhow::Result;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::warn;

use crate::AppState;
use crate::auth::{AuthError, AuthPayload};
use crate::handlers::http::utils::{HttpResponse, deliver_auth_error, deliver_success_json, not_found};

/// `GET /api/auth/me`: the stored profile behind the session.
pub async fn handle_me(
    _req: Request<Bytes>,
    state: AppState,
    identity: AuthPayload,
) -> Result<HttpResponse> {
    match state.store.find_by_id(identity.subject_id).await {
        Ok(Some(record)) => deliver_success_json(Some(record.to_user_info()), StatusCode::OK),
        Ok(None) => {
            warn!(user_id = identity.subject_id, "Session refers to a missing user");
            not_found("User not found")
        }
        Err(e) => deliver_auth_error(&AuthError::from(e)),
    }
}
