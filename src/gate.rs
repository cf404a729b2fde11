//! Request gates.
//!
//! A gate runs after routing and before the handler and either lets the request
//! through untouched or ends it with a [`GateRejection`]. All gates read the
//! identity that `auth::identity_layer` attached to the request; none of them
//! touch the store.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{auth::{AuthUser, Identity}, models::Role};

/// GateRejection
///
/// Why a gate stopped a request. Unauthenticated maps to 401, everything else to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateRejection {
    #[error("authentication required")]
    Unauthenticated,
    #[error("access denied")]
    Forbidden,
    #[error("email address is not verified")]
    Unverified,
}

impl GateRejection {
    pub fn status(self) -> StatusCode {
        match self {
            GateRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateRejection::Forbidden | GateRejection::Unverified => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// GateDecision
///
/// Terminal outcome of evaluating a gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Rejected(GateRejection),
}

/// evaluate
///
/// The role check. Allows only when an identity is present and its role equals
/// `required` exactly; an unrecognized stored role never matches.
pub fn evaluate(required: Role, identity: Option<&AuthUser>) -> GateDecision {
    match identity {
        None => GateDecision::Rejected(GateRejection::Unauthenticated),
        Some(user) => match &user.role {
            Ok(role) if *role == required => GateDecision::Allowed,
            Ok(_) | Err(_) => GateDecision::Rejected(GateRejection::Forbidden),
        },
    }
}

/// role_gate
///
/// Middleware bound to a route group with `from_fn_with_state(role, role_gate)`.
/// The required role is fixed when the router is built.
pub async fn role_gate(State(required): State<Role>, request: Request, next: Next) -> Response {
    let decision = {
        let identity = Identity::of(&request);
        let decision = evaluate(required, identity);
        if let GateDecision::Rejected(rejection) = decision {
            log_rejection(required, identity, rejection, request.uri().path());
        }
        decision
    };

    match decision {
        GateDecision::Allowed => next.run(request).await,
        GateDecision::Rejected(rejection) => rejection.into_response(),
    }
}

fn log_rejection(required: Role, identity: Option<&AuthUser>, rejection: GateRejection, path: &str) {
    match identity {
        Some(AuthUser { id, role: Err(unknown), .. }) => {
            tracing::warn!(user_id = %id, %unknown, %required, path, "stored role outside the role set, denying");
        }
        Some(AuthUser { id, role: Ok(role), .. }) => {
            tracing::debug!(user_id = %id, %role, %required, path, ?rejection, "role gate rejected request");
        }
        None => {
            tracing::debug!(%required, path, ?rejection, "role gate rejected anonymous request");
        }
    }
}

/// require_auth
///
/// Passes any resolved identity, whatever its role.
pub async fn require_auth(request: Request, next: Next) -> Response {
    if Identity::of(&request).is_none() {
        return GateRejection::Unauthenticated.into_response();
    }
    next.run(request).await
}

/// require_verified
///
/// Passes identities whose email address has been confirmed. Mounted inside
/// `require_auth`, but still rejects anonymous callers on its own.
pub async fn require_verified(request: Request, next: Next) -> Response {
    match Identity::of(&request) {
        None => GateRejection::Unauthenticated.into_response(),
        Some(user) if !user.email_verified => GateRejection::Unverified.into_response(),
        Some(_) => next.run(request).await,
    }
}
