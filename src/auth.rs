use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    config::{AppConfig, Env, MAX_TTL_MINUTES},
    gate::GateRejection,
    models::{Role, UnknownRole, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the bearer tokens issued by `/login` and `/register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id. The role is deliberately not embedded; it is
    /// re-read from the store on every request.
    pub sub: Uuid,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    /// `Err` when the stored tag is outside the role set. Such an identity can still
    /// reach routes without a role gate but fails every role gate.
    pub role: Result<Role, UnknownRole>,
    pub email_verified: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role(),
            email_verified: user.is_verified(),
        }
    }
}

/// Identity
///
/// Request extension written by [`identity_layer`]. `Identity(None)` means the
/// request was resolved and nobody is signed in.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<AuthUser>);

impl Identity {
    /// Reads the resolved identity from a request. A request that never went through
    /// the identity layer counts as anonymous.
    pub fn of(request: &Request) -> Option<&AuthUser> {
        request
            .extensions()
            .get::<Identity>()
            .and_then(|identity| identity.0.as_ref())
    }
}

/// issue_token
///
/// Signs a bearer token for `user_id`. Returns the token and its lifetime in seconds.
pub fn issue_token(
    user_id: Uuid,
    config: &AppConfig,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    // Configs built by hand bypass the range check in `AppConfig::load`.
    let ttl_secs = config.jwt_ttl_minutes.clamp(1, MAX_TTL_MINUTES) * 60;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: now.saturating_add(ttl_secs as u64) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &key)?;
    Ok((token, ttl_secs))
}

/// resolve_identity
///
/// Determines which user, if any, is making the request:
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user.
/// 2. Bearer token: HS256 JWT signed with the configured secret, not expired.
/// 3. Store lookup: the subject must still exist, so deleted accounts lose access
///    immediately.
///
/// Every failure, including store errors, yields `None`.
pub async fn resolve_identity(
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Option<AuthUser> {
    let user_id = if let Some(id) = local_bypass(headers, config) {
        id
    } else {
        bearer_subject(headers, config)?
    };

    match repo.get_user(user_id).await {
        Ok(Some(user)) => Some(AuthUser::from(&user)),
        Ok(None) => {
            tracing::debug!(%user_id, "token subject no longer exists");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, %user_id, "identity lookup failed");
            None
        }
    }
}

fn local_bypass(headers: &HeaderMap, config: &AppConfig) -> Option<Uuid> {
    if config.env != Env::Local {
        return None;
    }
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|id| Uuid::parse_str(id).ok())
}

fn bearer_subject(headers: &HeaderMap, config: &AppConfig) -> Option<Uuid> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .strip_prefix("Bearer ")?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            None
        }
    }
}

/// identity_layer
///
/// Outermost application middleware. Resolves the caller once per request and
/// stores the result as an [`Identity`] extension for the gates and handlers
/// further down. Never rejects by itself.
pub async fn identity_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = resolve_identity(request.headers(), &state.repo, &state.config).await;
    request.extensions_mut().insert(Identity(identity));
    next.run(request).await
}

/// AuthUser Extractor Implementation
///
/// Handlers take `AuthUser` as an argument. The extractor only reads the identity
/// that `identity_layer` resolved; a request that skipped the layer is anonymous.
///
/// Rejection: `GateRejection::Unauthenticated` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .and_then(|identity| identity.0.clone())
            .ok_or(GateRejection::Unauthenticated)
    }
}
