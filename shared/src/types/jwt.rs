use serde::{Deserialize, Serialize};

/// Claims embedded in every session token issued by the server.
///
/// Tokens are verified by signature and expiry alone. There is no server-side
/// session table, so nothing can revoke a token before `exp`: logout only
/// clears the browser cookie.
///
/// `roles` stays a list of plain strings on the wire. The server re-validates
/// every entry against its own role enumeration after the signature check and
/// never trusts an unknown value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Numeric user ID (matches `users.id`).
    pub sub: i64,

    pub email: String,

    /// Role names held at issue time. A role change only shows up here after
    /// the next login.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: u64,

    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: u64,
}
