use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{NewUser, ProfileChanges, User},
};

/// Repository Trait
///
/// Abstract contract for the user store. Handlers and the identity layer only see
/// this trait, so the Postgres implementation and the in-memory one are
/// interchangeable.
///
/// Implementations must keep `email` unique across all live users and must never
/// change a user's role.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    // Fails with `DuplicateEmail` instead of creating a second account.
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    // Changing the email clears `email_verified_at`.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the store across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, type, email_verified_at, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by the `users` table (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error, email: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::DuplicateEmail(email.to_string())
        }
        _ => RepoError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// The unique index on `users.email` is the source of truth; a violation is
    /// reported as `DuplicateEmail`.
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, type, email_verified_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.email_verified_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &user.email))
    }

    /// update_profile
    ///
    /// Uses COALESCE for partial updates. SET expressions see the old row, so the
    /// verification timestamp is only cleared when the email actually changes.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError> {
        let email = changes.email.clone().unwrap_or_default();
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2::text, name),
                email = COALESCE($3::text, email),
                email_verified_at = CASE
                    WHEN $3::text IS NOT NULL AND $3::text <> email THEN NULL
                    ELSE email_verified_at
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &email))?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// MemoryRepository
///
/// In-process store with the same uniqueness rules as the Postgres table. Used for
/// local runs without `DATABASE_URL` and throughout the test suite.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record verbatim, bypassing the typed `NewUser` path and its role
    /// check. Only meant for loading rows written by other systems, such as a
    /// legacy `type` column with tags outside the role set.
    #[doc(hidden)]
    pub async fn insert_raw(&self, user: User) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail(user.email));
        }
        users.insert(user.id, user);
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail(user.email));
        }
        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            user_type: user.role.as_str().to_string(),
            email_verified_at: user.email_verified_at,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::DuplicateEmail(email.clone()));
            }
        }
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            if email != user.email {
                user.email = email;
                user.email_verified_at = None;
            }
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}
