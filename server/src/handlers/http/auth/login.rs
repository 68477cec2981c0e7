use anyhow::Result;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::{info, warn};

use shared::types::LoginData;

use crate::AppState;
use crate::handlers::http::auth::{deliver_bad_request, deliver_session, deliver_session_error};
use crate::handlers::http::utils::{HttpResponse, parse_body};

/// `POST /api/auth/login`: JSON or urlencoded `{email, password}`.
pub async fn handle_login(req: Request<Bytes>, state: AppState) -> Result<HttpResponse> {
    info!("Processing login request");

    let login_data: LoginData = match parse_body(&req) {
        Ok(data) => data,
        Err(e) => {
            warn!("Login parsing failed: {}", e);
            return deliver_bad_request("INVALID_REQUEST", e.to_string());
        }
    };

    if let Err(field) = validate_login(&login_data) {
        warn!("Login validation failed: missing {}", field);
        return deliver_bad_request("MISSING_FIELD", format!("Missing required field: {}", field));
    }

    match state
        .credentials
        .login(&login_data.email, &login_data.password)
        .await
    {
        Ok(session) => deliver_session(&state, session, StatusCode::OK, "Login successful"),
        Err(e) => deliver_session_error(&e),
    }
}

fn validate_login(data: &LoginData) -> std::result::Result<(), &'static str> {
    if data.email.trim().is_empty() {
        return Err("email");
    }
    if data.password.is_empty() {
        return Err("password");
    }
    Ok(())
}
