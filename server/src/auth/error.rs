use http::StatusCode;
use thiserror::Error;

use shared::types::{ErrorResponse, SessionResponse};

use crate::auth::store::StoreError;

/// Every way an auth operation can refuse a request.
///
/// `InvalidCredentials` is uninformative: unknown email, wrong
/// password and deactivated account all render the same.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session token on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// A token was present but failed verification.
    #[error("invalid or expired session")]
    InvalidSession,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password policy violation: {0}")]
    PasswordPolicyViolation(String),

    #[error("email already in use")]
    DuplicateEmail,

    /// Unexpected failure while deciding. Never an implicit grant.
    #[error("internal authorization failure: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHORIZED",
            Self::InvalidSession => "INVALID_SESSION",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::PasswordPolicyViolation(_) => "WEAK_PASSWORD",
            Self::DuplicateEmail => "EMAIL_IN_USE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing text. `Internal` details stay in the logs.
    pub fn to_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Authentication required".to_string(),
            Self::InvalidSession => "Invalid or expired session".to_string(),
            Self::Forbidden => "Insufficient privileges".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::PasswordPolicyViolation(rule) => rule.clone(),
            Self::DuplicateEmail => "Email already in use".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidSession | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::PasswordPolicyViolation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> SessionResponse {
        SessionResponse::error(self.to_code(), self.to_message())
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.to_code(), &self.to_message())
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}
