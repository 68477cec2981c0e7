use anyhow::Result;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::{info, warn};

use shared::types::RegistrationData;

use crate::AppState;
use crate::handlers::http::auth::{deliver_bad_request, deliver_session, deliver_session_error};
use crate::handlers::http::utils::{HttpResponse, parse_body};

/// `POST /api/auth/register`: always creates a plain `user` and logs it in.
pub async fn handle_register(req: Request<Bytes>, state: AppState) -> Result<HttpResponse> {
    info!("Processing registration request");

    let data: RegistrationData = match parse_body(&req) {
        Ok(data) => data,
        Err(e) => {
            warn!("Registration parsing failed: {}", e);
            return deliver_bad_request("INVALID_REQUEST", e.to_string());
        }
    };

    if let Err((code, message)) = validate_registration(&data) {
        warn!("Registration validation failed: {}", code);
        return deliver_bad_request(code, message);
    }

    match state.credentials.register(data).await {
        Ok(session) => deliver_session(
            &state,
            session,
            StatusCode::CREATED,
            "Registration successful",
        ),
        Err(e) => deliver_session_error(&e),
    }
}

/// Shape checks only; strength rules live in the password policy.
fn validate_registration(data: &RegistrationData) -> std::result::Result<(), (&'static str, &'static str)> {
    if data.name.trim().is_empty() {
        return Err(("MISSING_FIELD", "Missing required field: name"));
    }
    if data.email.trim().is_empty() {
        return Err(("MISSING_FIELD", "Missing required field: email"));
    }
    if !is_valid_email(data.email.trim()) {
        return Err(("INVALID_EMAIL", "Invalid email address"));
    }
    if data.password.is_empty() {
        return Err(("MISSING_FIELD", "Missing required field: password"));
    }
    Ok(())
}

/// Basic shape: one `@` with something on both sides and a dot in the domain.
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.contains('@')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str, email: &str, password: &str) -> RegistrationData {
        RegistrationData {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            avatar: None,
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("ax.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@xcom"));
        assert!(!is_valid_email("a@@x.com"));
    }

    #[test]
    fn blank_fields_are_reported() {
        assert_eq!(
            validate_registration(&data(" ", "a@x.com", "Secret123")).unwrap_err().1,
            "Missing required field: name"
        );
        assert_eq!(
            validate_registration(&data("A", "a@x.com", "")).unwrap_err().1,
            "Missing required field: password"
        );
        assert!(validate_registration(&data("A", "a@x.com", "Secret123")).is_ok());
    }
}
