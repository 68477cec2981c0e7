#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use server::AppState;
use server::auth::{Clock, CredentialRecord, CredentialStore, NewCredential, PasswordHasher, Role};
use server::database::{self, SqliteCredentialStore};
use shared::types::AppConfig;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const T0: u64 = 1_700_000_000;
pub const DAY: u64 = 24 * 60 * 60;

/// Fast stand-in for argon2: `plain$<password>`.
#[derive(Debug, Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        Ok(format!("plain${}", plaintext))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        digest == format!("plain${}", plaintext)
    }
}

#[derive(Debug)]
pub struct TestClock(AtomicU64);

impl TestClock {
    pub fn at(secs: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(secs)))
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".into();
    config.auth.jwt_secret = Some(SECRET.into());
    config
}

pub async fn sqlite_store() -> Arc<SqliteCredentialStore> {
    let pool = database::connect("sqlite::memory:", 1).await.unwrap();
    database::create_tables(&pool).await.unwrap();
    Arc::new(SqliteCredentialStore::new(pool))
}

pub async fn state_with_clock(clock: Arc<TestClock>) -> (AppState, Arc<SqliteCredentialStore>) {
    let store = sqlite_store().await;
    let state =
        AppState::with_clock(config(), store.clone(), Arc::new(PlainHasher), clock).unwrap();
    (state, store)
}

pub async fn state() -> (AppState, Arc<SqliteCredentialStore>) {
    state_with_clock(TestClock::at(T0)).await
}

pub async fn seed_user(
    store: &SqliteCredentialStore,
    email: &str,
    password: &str,
    roles: &[Role],
) -> CredentialRecord {
    store
        .insert(NewCredential {
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            password_hash: PlainHasher.hash(password).unwrap(),
            roles: roles.to_vec(),
            avatar: None,
        })
        .await
        .unwrap()
}
