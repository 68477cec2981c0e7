use serde::{Deserialize, Serialize};

/// `{"status":"error","code":..,"message":..}`, the body of every failed
/// request that is not a login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            code: code.into(),
            message: message.into(),
        }
    }
}
