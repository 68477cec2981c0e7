//! Credential storage contract.

use async_trait::async_trait;
use thiserror::Error;

use shared::types::UserInfo;

use crate::auth::roles::{Role, role_names};

/// A stored account as the auth core sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub avatar: Option<String>,
    pub is_active: bool,
}

impl CredentialRecord {
    /// Public view; drops the hash.
    pub fn to_user_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            roles: role_names(&self.roles),
            avatar: self.avatar.clone(),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub avatar: Option<String>,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    pub roles: Option<Vec<Role>>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub deactivated_by: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The storage layer's uniqueness guard fired.
    #[error("email already in use")]
    DuplicateEmail,

    #[error("credential store failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `email` is expected already normalised (trimmed, lowercase).
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, StoreError>;

    /// Must reject a duplicate email with [`StoreError::DuplicateEmail`] even
    /// when two inserts race.
    async fn insert(&self, record: NewCredential) -> Result<CredentialRecord, StoreError>;

    async fn update(
        &self,
        id: i64,
        changes: CredentialUpdate,
    ) -> Result<Option<CredentialRecord>, StoreError>;
}
