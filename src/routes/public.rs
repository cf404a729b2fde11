use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no identity: landing page, health check and the
/// register/login pair that hands out bearer tokens.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        .route("/", get(handlers::welcome))
        // GET /health
        // Used by monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // New accounts always get the `user` role.
        .route("/register", post(handlers::register_user))
        // POST /login
        .route("/login", post(handlers::login))
}
