//! Credential verifier against a real sqlite store.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use hyper::StatusCode;

use server::auth::{
    Argon2PasswordHasher, AuthError, CredentialRecord, CredentialStore, CredentialUpdate,
    CredentialVerifier, NewCredential, PasswordHasher, PasswordPolicy, Role, StoreError,
    TokenService,
};
use server::database::SqliteCredentialStore;
use shared::types::{RegistrationData, SigningSecret};

use common::*;

fn registration(email: &str, password: &str) -> RegistrationData {
    RegistrationData {
        name: "Bob".into(),
        email: email.into(),
        password: password.into(),
        avatar: None,
    }
}

#[tokio::test]
async fn login_success_yields_token_for_the_account() {
    let (state, store) = state().await;
    seed_user(&store, "a@x.com", "secret123", &[Role::User]).await;

    let session = state.credentials.login("a@x.com", "secret123").await.unwrap();
    let payload = state.tokens.verify(&session.token).unwrap();
    assert_eq!(payload.email, "a@x.com");
    assert_eq!(payload.roles, vec![Role::User]);
    assert_eq!(session.user.email, "a@x.com");
}

#[tokio::test]
async fn state_keeps_the_config_it_was_built_from() {
    let (state, _) = state().await;
    assert_eq!(state.config.auth.jwt_secret.as_deref(), Some(SECRET));
    assert_eq!(
        state.tokens.ttl().as_secs(),
        state.config.auth.token_expiry_secs()
    );
}

#[tokio::test]
async fn login_failure_does_not_reveal_whether_email_exists() {
    let (state, store) = state().await;
    seed_user(&store, "a@x.com", "secret123", &[Role::User]).await;

    let missing = state
        .credentials
        .login("missing@x.com", "anything")
        .await
        .unwrap_err();
    let wrong = state
        .credentials
        .login("a@x.com", "wrongpass")
        .await
        .unwrap_err();

    assert_eq!(missing, AuthError::InvalidCredentials);
    assert_eq!(missing, wrong);
    assert_eq!(missing.to_message(), wrong.to_message());
    assert_eq!(missing.status(), wrong.status());
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_email_is_case_insensitive() {
    let (state, store) = state().await;
    seed_user(&store, "a@x.com", "secret123", &[Role::User]).await;
    assert!(state.credentials.login("  A@X.com ", "secret123").await.is_ok());
}

#[tokio::test]
async fn deactivated_account_gets_the_generic_failure() {
    let (state, store) = state().await;
    let record = seed_user(&store, "a@x.com", "secret123", &[Role::User]).await;
    store
        .update(
            record.id,
            CredentialUpdate {
                is_active: Some(false),
                ..CredentialUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        state.credentials.login("a@x.com", "secret123").await.unwrap_err(),
        AuthError::InvalidCredentials
    );
}

#[tokio::test]
async fn register_creates_plain_user_and_logs_in() {
    let (state, store) = state().await;
    let session = state
        .credentials
        .register(registration("New@Example.com", "Secret123"))
        .await
        .unwrap();

    assert_eq!(session.payload.roles, vec![Role::User]);
    assert_eq!(session.user.email, "new@example.com");
    assert!(state.tokens.verify(&session.token).is_some());

    let stored = store.find_by_email("new@example.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "Secret123");
    assert!(stored.is_active);
}

#[tokio::test]
async fn register_rejects_existing_email() {
    let (state, store) = state().await;
    seed_user(&store, "a@x.com", "secret123", &[Role::User]).await;

    let err = state
        .credentials
        .register(registration("A@x.com", "Secret123"))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::DuplicateEmail);
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_reports_the_failed_password_rule() {
    let (state, _) = state().await;
    let err = state
        .credentials
        .register(registration("b@x.com", "alllowercase1"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AuthError::PasswordPolicyViolation(
            "Password must contain at least one uppercase letter".into()
        )
    );
}

/// Store whose existence check always misses, as if another request
/// inserted the same email between our check and our insert.
struct RacingStore(Arc<SqliteCredentialStore>);

#[async_trait]
impl CredentialStore for RacingStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(None)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, StoreError> {
        self.0.find_by_id(id).await
    }

    async fn insert(&self, record: NewCredential) -> Result<CredentialRecord, StoreError> {
        self.0.insert(record).await
    }

    async fn update(
        &self,
        id: i64,
        changes: CredentialUpdate,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        self.0.update(id, changes).await
    }
}

#[tokio::test]
async fn storage_level_duplicate_surfaces_as_duplicate_email() {
    let inner = sqlite_store().await;
    seed_user(&inner, "a@x.com", "secret123", &[Role::User]).await;

    let tokens = Arc::new(TokenService::new(
        &SigningSecret::new(SECRET),
        std::time::Duration::from_secs(DAY),
    ));
    let verifier = CredentialVerifier::new(
        Arc::new(RacingStore(inner)),
        Arc::new(PlainHasher),
        tokens,
        PasswordPolicy::default(),
    );

    assert_eq!(
        verifier
            .register(registration("a@x.com", "Secret123"))
            .await
            .unwrap_err(),
        AuthError::DuplicateEmail
    );
}

#[tokio::test]
async fn argon2_end_to_end() {
    let store = sqlite_store().await;
    let tokens = Arc::new(TokenService::new(
        &SigningSecret::new(SECRET),
        std::time::Duration::from_secs(DAY),
    ));
    let verifier = CredentialVerifier::new(
        store.clone(),
        Arc::new(Argon2PasswordHasher),
        tokens,
        PasswordPolicy::default(),
    );

    verifier
        .register(registration("argon@x.com", "Secret123"))
        .await
        .unwrap();
    let stored = store.find_by_email("argon@x.com").await.unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$argon2id$"));

    assert!(verifier.login("argon@x.com", "Secret123").await.is_ok());
    assert_eq!(
        verifier.login("argon@x.com", "Secret124").await.unwrap_err(),
        AuthError::InvalidCredentials
    );
}

/// Counts `verify` calls so tests can see how much hash work a login did.
#[derive(Default)]
struct CountingHasher {
    verifies: AtomicUsize,
}

impl PasswordHasher for CountingHasher {
    fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        PlainHasher.hash(plaintext)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        PlainHasher.verify(plaintext, digest)
    }
}

#[tokio::test]
async fn unknown_email_does_the_same_hash_work_as_wrong_password() {
    let store = sqlite_store().await;
    seed_user(&store, "a@x.com", "secret123", &[Role::User]).await;
    let hasher = Arc::new(CountingHasher::default());
    let tokens = Arc::new(TokenService::new(
        &SigningSecret::new(SECRET),
        std::time::Duration::from_secs(DAY),
    ));
    let verifier = CredentialVerifier::new(
        store,
        hasher.clone(),
        tokens,
        PasswordPolicy::default(),
    );

    let missing = verifier.login("ghost@x.com", "anything").await.unwrap_err();
    assert_eq!(hasher.verifies.load(Ordering::SeqCst), 1);

    let wrong = verifier.login("a@x.com", "wrongpass").await.unwrap_err();
    assert_eq!(hasher.verifies.load(Ordering::SeqCst), 2);
    assert_eq!(missing, wrong);

    // Even the decoy's own plaintext never logs anyone in.
    assert_eq!(
        verifier
            .login("ghost@x.com", "decoy-password-never-matches")
            .await
            .unwrap_err(),
        AuthError::InvalidCredentials
    );
}
