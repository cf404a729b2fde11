use anyhow::Context;
use role_portal::{
    AppState, Argon2Verifier, CredentialState,
    config::{AppConfig, Env},
    create_router,
    repository::{MemoryRepository, PostgresRepository, RepositoryState},
    seed,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, user store, router, HTTP server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (fail-fast in production).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise local-friendly defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "role_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let credentials = Arc::new(Argon2Verifier) as CredentialState;

    // 3. User store. Without DATABASE_URL (local only) an in-memory store is seeded
    //    with the bootstrap accounts.
    let repo = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .context("FATAL: Failed to connect to Postgres. Check DATABASE_URL.")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("FATAL: Failed to apply database migrations.")?;
            Arc::new(PostgresRepository::new(pool)) as RepositoryState
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using a seeded in-memory user store");
            let memory = MemoryRepository::new();
            seed::seed_users(&memory, credentials.as_ref())
                .await
                .context("seeding in-memory store")?;
            Arc::new(memory) as RepositoryState
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        credentials,
        config,
    };

    // 4. Router. An invalid role-group table stops the process here.
    let app = create_router(app_state).context("FATAL: invalid route configuration")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
