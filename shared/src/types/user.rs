use serde::{Deserialize, Serialize};

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Body of `PUT /api/users/:id/roles`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdate {
    pub roles: Vec<String>,
}

fn default_active() -> bool {
    true
}
