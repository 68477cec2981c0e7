//! Authorization and session core.
//!
//! Leaves first: [`permissions`] -> [`roles`] -> [`evaluator`]; [`token`] and
//! [`session`] stand alone; [`gate`] ties the evaluator to verified tokens and
//! [`credentials`] turns an email + password into a token.

pub mod credentials;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

pub use self::credentials::{AuthSession, CredentialVerifier, PasswordPolicy, normalize_email};
pub use self::error::AuthError;
pub use self::evaluator::{compute_mask, compute_mask_from_names, has_permission};
pub use self::gate::{AuthGate, Requirement, owner_or_roles};
pub use self::password::{Argon2PasswordHasher, PasswordHasher};
pub use self::permissions::Permissions;
pub use self::roles::Role;
pub use self::session::{AUTH_COOKIE, CookieAttributes, SameSite, SessionTransport};
pub use self::store::{CredentialRecord, CredentialStore, CredentialUpdate, NewCredential, StoreError};
pub use self::token::{AuthPayload, Clock, SystemClock, TokenError, TokenService};
