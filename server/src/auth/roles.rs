//! Roles and the permission set each one carries.
//!
//! Tiers are cumulative. Each tier's mask is built as "tier below ∪ own
//! grants", never as an independent list, so a grant added to `user` shows up
//! in `moderator` and `admin` without anyone remembering to copy it. `admin`
//! is defined as every permission in the catalogue, including ones added
//! later.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::permissions::Permissions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

const USER_GRANTS: Permissions = Permissions::TASK_READ
    .union(Permissions::TASK_CREATE)
    .union(Permissions::TASK_UPDATE)
    .union(Permissions::CATEGORY_READ)
    .union(Permissions::USER_READ);

const MODERATOR_GRANTS: Permissions = Permissions::TASK_DELETE
    .union(Permissions::TASK_ASSIGN)
    .union(Permissions::CATEGORY_CREATE)
    .union(Permissions::CATEGORY_UPDATE);

pub const USER_MASK: Permissions = USER_GRANTS;
pub const MODERATOR_MASK: Permissions = USER_MASK.union(MODERATOR_GRANTS);
pub const ADMIN_MASK: Permissions = MODERATOR_MASK.union(Permissions::all());

impl Role {
    /// Lowest tier first.
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    /// The tier any unrecognised role value is coerced to.
    pub const LOWEST: Role = Role::User;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// Case-insensitive parse. `None` for anything outside the enumeration.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Exact wire name only, as written by [`Role::as_str`]. Used for signed
    /// claims, where `"ADMIN"` is not `"admin"`.
    pub fn from_claim(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }

    /// Accumulated permission mask for this tier.
    pub const fn permissions(self) -> Permissions {
        match self {
            Self::User => USER_MASK,
            Self::Moderator => MODERATOR_MASK,
            Self::Admin => ADMIN_MASK,
        }
    }

    /// The tier this one inherits from, if any.
    pub fn parent(self) -> Option<Role> {
        match self {
            Self::User => None,
            Self::Moderator => Some(Self::User),
            Self::Admin => Some(Self::Moderator),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Role names as they go on the wire and into storage.
pub fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}
