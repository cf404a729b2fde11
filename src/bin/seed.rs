use anyhow::Context;
use role_portal::{Argon2Verifier, PostgresRepository, seed};
use sqlx::postgres::PgPoolOptions;

/// Seeds the admin, manager and user bootstrap accounts into the Postgres store.
///
/// Running it against a store that already holds them fails on the duplicate
/// emails instead of creating second copies.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "role_portal=info".into()),
        )
        .init();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .context("connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("apply migrations")?;

    let repo = PostgresRepository::new(pool);
    let users = seed::seed_users(&repo, &Argon2Verifier)
        .await
        .context("seeding bootstrap accounts")?;

    tracing::info!(count = users.len(), "seeding complete");
    Ok(())
}
