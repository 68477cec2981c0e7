use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::auth::roles::{Role, role_names};
use crate::auth::store::{
    CredentialRecord, CredentialStore, CredentialUpdate, NewCredential, StoreError,
};
use crate::database::get_timestamp;

const USER_COLUMNS: &str = "id, name, email, avatar, password_hash, roles, is_active";

/// [`CredentialStore`] over the `users` table.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn backend(context: &str, e: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("{}: {}", context, e))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn encode_roles(roles: &[Role]) -> Result<String, StoreError> {
    serde_json::to_string(&role_names(roles))
        .map_err(|e| StoreError::Backend(format!("Failed to encode roles: {}", e)))
}

/// Role names outside the enumeration are dropped, not promoted or coerced.
fn decode_roles(user_id: i64, raw: &str) -> Result<Vec<Role>, StoreError> {
    let names: Vec<String> = serde_json::from_str(raw).map_err(|e| {
        StoreError::Backend(format!("Malformed roles for user {}: {}", user_id, e))
    })?;

    Ok(names
        .iter()
        .filter_map(|name| {
            let role = Role::parse(name);
            if role.is_none() {
                warn!(user_id, role = %name, "Ignoring unknown stored role");
            }
            role
        })
        .collect())
}

fn row_to_record(row: &SqliteRow) -> Result<CredentialRecord, StoreError> {
    let get_err = |e| backend("Failed to read user row", e);

    let id: i64 = row.try_get("id").map_err(get_err)?;
    let raw_roles: String = row.try_get("roles").map_err(get_err)?;

    Ok(CredentialRecord {
        id,
        name: row.try_get("name").map_err(get_err)?,
        email: row.try_get("email").map_err(get_err)?,
        avatar: row.try_get("avatar").map_err(get_err)?,
        password_hash: row.try_get("password_hash").map_err(get_err)?,
        roles: decode_roles(id, &raw_roles)?,
        is_active: row.try_get("is_active").map_err(get_err)?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend("Failed to look up user by email", e))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend("Failed to look up user by id", e))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert(&self, record: NewCredential) -> Result<CredentialRecord, StoreError> {
        let now = get_timestamp();
        let roles = encode_roles(&record.roles)?;

        let result = sqlx::query(
            "INSERT INTO users (name, email, avatar, password_hash, roles, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.avatar)
        .bind(&record.password_hash)
        .bind(&roles)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                debug!("Insert rejected by UNIQUE(email)");
                StoreError::DuplicateEmail
            } else {
                backend("Failed to insert user", e)
            }
        })?;

        let id = result.last_insert_rowid();
        info!(user_id = id, "New user stored");

        Ok(CredentialRecord {
            id,
            name: record.name,
            email: record.email,
            password_hash: record.password_hash,
            roles: record.roles,
            avatar: record.avatar,
            is_active: true,
        })
    }

    async fn update(
        &self,
        id: i64,
        changes: CredentialUpdate,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let now = get_timestamp();
        let roles = changes.roles.as_deref().map(encode_roles).transpose()?;

        // Reactivation clears the deactivation trail; deactivation stamps it.
        let result = sqlx::query(
            "UPDATE users SET
                roles          = COALESCE(?, roles),
                password_hash  = COALESCE(?, password_hash),
                is_active      = COALESCE(?, is_active),
                deactivated_by = CASE WHEN ? = 1 THEN NULL ELSE COALESCE(?, deactivated_by) END,
                deactivated_at = CASE WHEN ? = 1 THEN NULL WHEN ? = 0 THEN ? ELSE deactivated_at END,
                updated_at     = ?
             WHERE id = ?",
        )
        .bind(roles)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .bind(changes.is_active)
        .bind(changes.deactivated_by)
        .bind(changes.is_active)
        .bind(changes.is_active)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| backend("Failed to update user", e))?;

        if result.rows_affected() == 0 {
            debug!(user_id = id, "Update matched no user");
            return Ok(None);
        }

        self.find_by_id(id).await
    }
}
