use chrono::Utc;

use crate::{
    error::RepoError,
    models::{NewUser, Role, User},
    password::{CredentialError, CredentialVerifier},
    repository::Repository,
};

/// Placeholder password shared by the bootstrap accounts. Only for local and test
/// environments.
pub const SEED_PASSWORD: &str = "password";

/// SeedAccount
pub struct SeedAccount {
    pub name: &'static str,
    pub email: &'static str,
    pub role: Role,
}

/// One account per role.
pub const SEED_ACCOUNTS: [SeedAccount; 3] = [
    SeedAccount {
        name: "Admin",
        email: "admin@example.com",
        role: Role::Admin,
    },
    SeedAccount {
        name: "Manager",
        email: "manager@example.com",
        role: Role::Manager,
    },
    SeedAccount {
        name: "User",
        email: "user@example.com",
        role: Role::User,
    },
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// seed_users
///
/// Creates the bootstrap accounts, already verified. Not idempotent: on a store that
/// already holds them the first insert fails with `RepoError::DuplicateEmail`, and
/// nothing is duplicated.
pub async fn seed_users(
    repo: &dyn Repository,
    credentials: &dyn CredentialVerifier,
) -> Result<Vec<User>, SeedError> {
    let mut created = Vec::with_capacity(SEED_ACCOUNTS.len());
    for account in &SEED_ACCOUNTS {
        let user = repo
            .create_user(NewUser {
                name: account.name.to_string(),
                email: account.email.to_string(),
                password_hash: credentials.hash(SEED_PASSWORD)?,
                role: account.role,
                email_verified_at: Some(Utc::now()),
            })
            .await?;
        tracing::info!(email = %user.email, role = %account.role, "seeded account");
        created.push(user);
    }
    Ok(created)
}
