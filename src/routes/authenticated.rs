use crate::{AppState, gate, handlers};
use axum::{Router, middleware, routing::get};

/// Authenticated Router Module
///
/// Routes open to any signed-in user regardless of role. The whole router sits
/// behind `gate::require_auth`; `/dashboard` additionally requires a verified
/// email address.
///
/// Layer order: the last `route_layer` added runs first, so `require_auth` always
/// runs before `require_verified`.
pub fn authenticated_routes() -> Router<AppState> {
    let verified = Router::<AppState>::new()
        // GET /dashboard
        .route("/dashboard", get(handlers::dashboard))
        .route_layer(middleware::from_fn(gate::require_verified));

    Router::<AppState>::new()
        // GET/PATCH/DELETE /profile
        // Edit view, partial update, and password-confirmed account deletion.
        .route(
            "/profile",
            get(handlers::edit_profile)
                .patch(handlers::update_profile)
                .delete(handlers::destroy_profile),
        )
        .merge(verified)
        .route_layer(middleware::from_fn(gate::require_auth))
}
