use serde::Deserialize;

/// Self-service registration body.
///
/// There is no `roles` field: every self-registered account
/// starts as a plain `user`, and only an admin can change that afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}
