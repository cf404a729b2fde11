#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use role_portal::{
    AppConfig, AppState, create_router,
    auth::issue_token,
    models::{NewUser, Role, User},
    password::{CredentialError, CredentialVerifier},
    repository::{MemoryRepository, Repository},
};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;
use uuid::Uuid;

// --- Test Doubles ---

/// Cheap stand-in for Argon2 so tests do not spend seconds hashing.
pub struct FakeVerifier;

impl CredentialVerifier for FakeVerifier {
    fn hash(&self, plain: &str) -> Result<String, CredentialError> {
        Ok(format!("fake-hash:{plain}"))
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, CredentialError> {
        hash.strip_prefix("fake-hash:")
            .map(|stored| stored == plain)
            .ok_or_else(|| CredentialError::MalformedHash(hash.to_string()))
    }

    fn decoy_hash(&self) -> String {
        "fake-hash:\u{0}decoy".to_string()
    }
}

/// Wraps `FakeVerifier` and counts `verify` calls.
#[derive(Default)]
pub struct CountingVerifier {
    pub verify_calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl CredentialVerifier for CountingVerifier {
    fn hash(&self, plain: &str) -> Result<String, CredentialError> {
        FakeVerifier.hash(plain)
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, CredentialError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        FakeVerifier.verify(plain, hash)
    }

    fn decoy_hash(&self) -> String {
        FakeVerifier.decoy_hash()
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub config: AppConfig,
}

pub fn test_state(repo: Arc<MemoryRepository>) -> AppState {
    AppState {
        repo,
        credentials: Arc::new(FakeVerifier),
        config: AppConfig::default(),
    }
}

pub fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let state = test_state(repo.clone());
    let config = state.config.clone();
    let router = create_router(state).expect("default role groups are valid");
    TestApp {
        router,
        repo,
        config,
    }
}

impl TestApp {
    pub async fn create_user(&self, email: &str, role: Role, verified: bool) -> User {
        self.repo
            .create_user(NewUser {
                name: email.split('@').next().unwrap_or("someone").to_string(),
                email: email.to_string(),
                password_hash: FakeVerifier.hash("password").unwrap(),
                role,
                email_verified_at: verified.then(Utc::now),
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        issue_token(user_id, &self.config).unwrap().0
    }

    /// Sends a request and returns the status plus the body parsed as JSON
    /// (`Value::Null` for empty or non-JSON bodies).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, None)).await
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, json: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match json {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
