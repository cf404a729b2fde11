use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; pulled into handlers and extractors via `FromRef`.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local identity bypass and log format.
    pub env: Env,
    // Postgres connection string. Optional locally, where an in-memory store is used instead.
    pub db_url: Option<String>,
    // HMAC secret used to sign and validate bearer tokens.
    pub jwt_secret: String,
    // Lifetime of issued bearer tokens.
    pub jwt_ttl_minutes: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (in-memory store, `x-user-id` bypass) and the hardened production setup.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ConfigError
///
/// Startup-time misconfiguration. The server refuses to start rather than serve
/// with an ambiguous gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("route group `{prefix}` has no required role")]
    MissingRole { prefix: String },
    #[error("route group `{prefix}` requires unknown role `{tag}`")]
    UnknownRole { prefix: String, tag: String },
    #[error("route group `{prefix}` is registered more than once")]
    DuplicatePrefix { prefix: String },
}

/// Upper bound for `JWT_TTL_MINUTES` (30 days). Larger values fall back to the default.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 30;

const LOCAL_JWT_SECRET: &str = "local-development-secret-do-not-use-in-production";

impl Default for AppConfig {
    /// Safe, non-panicking configuration for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_ttl_minutes: 60,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, so the
    /// service never starts with an insecure or incomplete configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_ttl_minutes = env::var("JWT_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| (1..=MAX_TTL_MINUTES).contains(v))
            .unwrap_or(60);

        let bind_addr = format!(
            "{}:{}",
            env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            env::var("APP_PORT").unwrap_or_else(|_| "3000".into())
        );

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                jwt_ttl_minutes,
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                jwt_ttl_minutes,
                bind_addr,
            },
        }
    }
}
