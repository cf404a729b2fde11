use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod seed;

// Routing segregated by access level (public, authenticated, role groups).
pub mod routes;
use routes::{authenticated, public, role_groups};

// --- Public Re-exports ---

pub use config::{AppConfig, ConfigError};
pub use password::{Argon2Verifier, CredentialState};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::welcome, handlers::register_user, handlers::login, handlers::dashboard,
        handlers::edit_profile, handlers::update_profile, handlers::destroy_profile,
        handlers::admin_dashboard, handlers::manager_dashboard, handlers::user_dashboard
    ),
    components(
        schemas(
            models::Role, models::RegisterUserRequest, models::LoginRequest,
            models::UpdateProfileRequest, models::DeleteProfileRequest, models::TokenResponse,
            models::UserProfile, models::DashboardView, models::WelcomeView,
        )
    ),
    tags(
        (name = "role-portal", description = "Role-gated dashboards and account management")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single, immutable container for the shared services. Cloned per request; every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// User store.
    pub repo: RepositoryState,
    /// One-way credential hashing and verification.
    pub credentials: CredentialState,
    /// The loaded environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for CredentialState {
    fn from_ref(app_state: &AppState) -> CredentialState {
        app_state.credentials.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the whole routing structure with the default role-group table.
///
/// # Errors
/// `ConfigError` when the role-group table is invalid. Callers must treat this as
/// fatal.
pub fn create_router(state: AppState) -> Result<Router, ConfigError> {
    create_router_with_groups(state, role_groups::ROLE_GROUPS)
}

/// create_router_with_groups
///
/// Same as [`create_router`] with an explicit role-group table.
pub fn create_router_with_groups(
    state: AppState,
    groups: &[(&str, &str)],
) -> Result<Router, ConfigError> {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(role_groups::role_group_routes(groups)?)
        // Identity resolution wraps every route, so each gate below finds the
        // caller in the request extensions.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identity_layer,
        ))
        .with_state(state);

    Ok(base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors))
}

/// trace_span_logger
///
/// Span maker for `TraceLayer`: method, URI and the generated `x-request-id`, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
