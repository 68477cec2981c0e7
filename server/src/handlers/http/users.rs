use anyhow::Result;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use tracing::{info, warn};

use shared::types::RoleUpdate;

use crate::AppState;
use crate::auth::gate::owner_or_roles;
use crate::auth::{AuthError, AuthPayload, CredentialUpdate, Role, normalize_email};
use crate::handlers::http::utils::*;

/// Moderators and admins may read any account; everyone else only their own.
const READ_ANY: &[Role] = &[Role::Moderator, Role::Admin];

/// `GET /api/users/:id`
pub async fn handle_get_user(
    req: Request<Bytes>,
    state: AppState,
    identity: AuthPayload,
) -> Result<HttpResponse> {
    let Some(user_id) = path_id(&req, "id") else {
        return bad_request("INVALID_ID", "Invalid user id");
    };

    if !owner_or_roles(&identity, user_id, READ_ANY) {
        warn!(
            user_id = identity.subject_id,
            target = user_id,
            "Denied read of another user's record"
        );
        return deliver_auth_error(&AuthError::Forbidden);
    }

    match state.store.find_by_id(user_id).await {
        Ok(Some(record)) => deliver_success_json(Some(record.to_user_info()), StatusCode::OK),
        Ok(None) => not_found("User not found"),
        Err(e) => deliver_auth_error(&AuthError::from(e)),
    }
}

/// `GET /api/users/by-email/:email`
pub async fn handle_get_user_by_email(
    req: Request<Bytes>,
    state: AppState,
    _identity: AuthPayload,
) -> Result<HttpResponse> {
    let Some(email) = path_param(&req, "email").map(normalize_email) else {
        return bad_request("INVALID_EMAIL", "Invalid email address");
    };

    match state.store.find_by_email(&email).await {
        Ok(Some(record)) => deliver_success_json(Some(record.to_user_info()), StatusCode::OK),
        Ok(None) => not_found("User not found"),
        Err(e) => deliver_auth_error(&AuthError::from(e)),
    }
}

/// `PUT /api/users/:id/roles`: replaces the whole list. Tokens already
/// issued keep their old roles until the next login.
pub async fn handle_update_roles(
    req: Request<Bytes>,
    state: AppState,
    identity: AuthPayload,
) -> Result<HttpResponse> {
    let Some(user_id) = path_id(&req, "id") else {
        return bad_request("INVALID_ID", "Invalid user id");
    };

    let update: RoleUpdate = match parse_body(&req) {
        Ok(update) => update,
        Err(e) => return bad_request("INVALID_REQUEST", &e.to_string()),
    };

    let mut roles = Vec::with_capacity(update.roles.len());
    for name in &update.roles {
        match name.parse::<Role>() {
            Ok(role) => roles.push(role),
            Err(e) => return bad_request("INVALID_ROLE", &e.to_string()),
        }
    }
    roles.sort();
    roles.dedup();

    if roles.is_empty() {
        return bad_request("INVALID_ROLE", "At least one role is required");
    }

    let changes = CredentialUpdate {
        roles: Some(roles.clone()),
        ..CredentialUpdate::default()
    };

    match state.store.update(user_id, changes).await {
        Ok(Some(record)) => {
            info!(
                user_id = identity.subject_id,
                target = user_id,
                roles = ?roles,
                "Roles updated"
            );
            deliver_success_json(Some(record.to_user_info()), StatusCode::OK)
        }
        Ok(None) => not_found("User not found"),
        Err(e) => deliver_auth_error(&AuthError::from(e)),
    }
}

/// `POST /api/users/:id/deactivate`: flips `is_active`; roles are untouched.
pub async fn handle_deactivate(
    req: Request<Bytes>,
    state: AppState,
    identity: AuthPayload,
) -> Result<HttpResponse> {
    let Some(user_id) = path_id(&req, "id") else {
        return bad_request("INVALID_ID", "Invalid user id");
    };

    let changes = CredentialUpdate {
        is_active: Some(false),
        deactivated_by: Some(identity.subject_id),
        ..CredentialUpdate::default()
    };

    match state.store.update(user_id, changes).await {
        Ok(Some(record)) => {
            info!(
                user_id = identity.subject_id,
                target = user_id,
                "Account deactivated"
            );
            deliver_success_json(Some(record.to_user_info()), StatusCode::OK)
        }
        Ok(None) => not_found("User not found"),
        Err(e) => deliver_auth_error(&AuthError::from(e)),
    }
}
