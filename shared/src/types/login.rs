use serde::{Deserialize, Serialize};

use crate::types::user::UserInfo;

// ---------------------------------------------------------------------------
// Login wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginData {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

/// Envelope returned by login and registration.
///
/// The token itself never appears in the body; it travels only in the
/// `auth_token` cookie.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionResponse {
    Success {
        user: UserInfo,
        /// Seconds until the session cookie expires.
        expires_in: u64,
        message: String,
    },
    Error {
        code: String,
        message: String,
    },
}

impl SessionResponse {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
