//! sqlite persistence for credentials.

pub mod users;

pub use self::users::SqliteCredentialStore;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

/// Bump together with a new arm in `run_migrations`.
const SCHEMA_VERSION: i64 = 1;

/// Unix timestamp in seconds.
pub fn get_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Open a pool. An in-memory database is pinned to one connection that is
/// never recycled, since every sqlite connection to `:memory:` is a separate
/// database.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let in_memory = url.contains(":memory:");
    let max = if in_memory { 1 } else { max_connections.max(1) };
    let mut options = SqlitePoolOptions::new().max_connections(max);
    if in_memory {
        options = options.idle_timeout(None).max_lifetime(None);
    }
    let pool = options
        .connect(url)
        .await
        .with_context(|| format!("Failed to open database {}", url))?;
    info!("Database connected: {} (pool size {})", url, max);
    Ok(pool)
}

/// Create the schema on a fresh database and bring an old one up to date.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            name           TEXT    NOT NULL,
            email          TEXT    NOT NULL UNIQUE,
            avatar         TEXT,
            password_hash  TEXT    NOT NULL,
            roles          TEXT    NOT NULL DEFAULT '[\"user\"]',
            is_active      INTEGER NOT NULL DEFAULT 1,
            deactivated_by INTEGER,
            deactivated_at INTEGER,
            created_at     INTEGER NOT NULL,
            updated_at     INTEGER NOT NULL,
            FOREIGN KEY (deactivated_by) REFERENCES users(id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    run_migrations(pool).await
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .context("Failed to read schema version")?;

    if current < SCHEMA_VERSION {
        // Version 1 is the initial schema; nothing to transform yet.
        sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .execute(pool)
            .await
            .context("Failed to record schema version")?;
        info!("Schema migrated from v{} to v{}", current, SCHEMA_VERSION);
    }

    Ok(())
}
