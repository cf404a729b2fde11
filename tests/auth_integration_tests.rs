mod common;

use axum::http::StatusCode;
use common::{CountingVerifier, request, spawn_app, test_state};
use role_portal::{
    AppState, create_router,
    models::Role,
    repository::{MemoryRepository, Repository},
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

// --- Registration & Login ---

#[tokio::test]
async fn register_creates_a_plain_user_and_signs_in() {
    let app = spawn_app();

    let (status, body) = app
        .send(request(
            "POST",
            "/register",
            None,
            Some(json!({
                "name": "Ada",
                "email": "Ada@Example.com",
                "password": "correct-horse",
                "role": "admin"
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    // The extra "role" field is ignored; registration always yields `user`.
    let stored = app
        .repo
        .find_user_by_email("ada@example.com")
        .await
        .unwrap()
        .expect("user stored with normalized email");
    assert_eq!(stored.role(), Ok(Role::User));
    assert_ne!(stored.password_hash, "correct-horse");

    let (status, _) = app.get("/user/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/admin/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let app = spawn_app();
    app.create_user("taken@example.com", Role::User, true).await;

    let (status, _) = app
        .send(request(
            "POST",
            "/register",
            None,
            Some(json!({ "name": "Dup", "email": "TAKEN@example.com", "password": "long-enough" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(request(
            "POST",
            "/register",
            None,
            Some(json!({ "name": "Short", "email": "short@example.com", "password": "123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn login_issues_a_token_for_valid_credentials() {
    let app = spawn_app();
    let manager = app
        .create_user("manager@example.com", Role::Manager, true)
        .await;

    let (status, body) = app
        .send(request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "manager@example.com", "password": "password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expires_in"], 3600);

    let token = body["access_token"].as_str().unwrap();
    let (status, body) = app.get("/manager/dashboard", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], manager.id.to_string());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.create_user("user@example.com", Role::User, true).await;

    let (wrong_password, body_a) = app
        .send(request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "user@example.com", "password": "nope-nope" })),
        ))
        .await;
    let (unknown_email, body_b) = app
        .send(request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password" })),
        ))
        .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn login_with_unknown_email_still_verifies_a_password() {
    let verifier = Arc::new(CountingVerifier::default());
    let state = AppState {
        credentials: verifier.clone(),
        ..test_state(Arc::new(MemoryRepository::new()))
    };
    let router = create_router(state).unwrap();

    let response = router
        .oneshot(request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(verifier.calls(), 1);
}

// --- Verified dashboard ---

#[tokio::test]
async fn generic_dashboard_requires_verified_email() {
    let app = spawn_app();
    let unverified = app.create_user("new@example.com", Role::User, false).await;
    let verified = app.create_user("old@example.com", Role::User, true).await;

    let (status, _) = app.get("/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .get("/dashboard", Some(&app.token_for(unverified.id)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "email address is not verified");

    let (status, body) = app
        .get("/dashboard", Some(&app.token_for(verified.id)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "dashboard");
}

// --- Profile management ---

#[tokio::test]
async fn profile_routes_require_identity() {
    let app = spawn_app();
    for method in ["GET", "PATCH", "DELETE"] {
        let (status, _) = app
            .send(request(method, "/profile", None, Some(json!({}))))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} /profile");
    }
}

#[tokio::test]
async fn profile_update_changes_fields_but_never_role() {
    let app = spawn_app();
    let user = app.create_user("user@example.com", Role::User, true).await;
    let token = app.token_for(user.id);

    let (status, body) = app
        .send(request(
            "PATCH",
            "/profile",
            Some(&token),
            Some(json!({ "name": "Renamed", "email": "moved@example.com", "role": "admin" })),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["email"], "moved@example.com");
    assert_eq!(body["role"], "user");
    assert!(body["email_verified_at"].is_null());

    let (status, _) = app.get("/admin/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_update_to_taken_email_conflicts() {
    let app = spawn_app();
    app.create_user("admin@example.com", Role::Admin, true).await;
    let user = app.create_user("user@example.com", Role::User, true).await;

    let (status, _) = app
        .send(request(
            "PATCH",
            "/profile",
            Some(&app.token_for(user.id)),
            Some(json!({ "email": "admin@example.com" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn profile_destroy_requires_password_and_revokes_access() {
    let app = spawn_app();
    let user = app.create_user("user@example.com", Role::User, true).await;
    let token = app.token_for(user.id);

    let (status, _) = app
        .send(request(
            "DELETE",
            "/profile",
            Some(&token),
            Some(json!({ "password": "wrong-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.repo.get_user(user.id).await.unwrap().is_some());

    let (status, _) = app
        .send(request(
            "DELETE",
            "/profile",
            Some(&token),
            Some(json!({ "password": "password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.repo.get_user(user.id).await.unwrap().is_none());

    let (status, _) = app.get("/user/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- Public routes ---

#[tokio::test]
async fn public_routes_need_no_identity() {
    let app = spawn_app();

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "welcome");

    let (status, _) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/admin/dashboard"].is_object());
}
