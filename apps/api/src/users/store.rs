use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::models::user::{NewUser, User, ROLE_USER};

const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Which unique key a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Id,
    Email,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0:?}")]
    UniqueViolation(UniqueKey),

    #[error("user {0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(UniqueKey::Email) => {
                AppError::DuplicateEmail("Email address is already in use".to_string())
            }
            StoreError::UniqueViolation(UniqueKey::Id) => {
                AppError::Conflict("User already exists".to_string())
            }
            StoreError::NotFound(id) => AppError::NotFound(format!("User {id} not found")),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

/// The users table. The database's unique constraints on `id` and `email`
/// are the only concurrency control; callers react to `UniqueViolation`.
///
/// Carried in `AppState` as `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn insert(&self, user: &NewUser) -> Result<User, StoreError>;

    /// Create-or-update keyed by `id`; safe to repeat with the same input.
    async fn upsert_by_id(&self, user: &NewUser) -> Result<User, StoreError>;

    /// Sets `last_active_date` to now and, when given, the verification flag.
    async fn touch(&self, id: &str, is_verified: Option<bool>) -> Result<User, StoreError>;

    /// Refreshes email and verification from the provider, then touches.
    async fn sync(
        &self,
        id: &str,
        email: Option<&str>,
        is_verified: bool,
    ) -> Result<User, StoreError>;

    async fn update_email(&self, id: &str, email: &str) -> Result<User, StoreError>;

    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;
}

fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let key = match db.constraint() {
                Some(EMAIL_CONSTRAINT) => UniqueKey::Email,
                _ => UniqueKey::Id,
            };
            return StoreError::UniqueViolation(key);
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, is_verified, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.is_verified)
        .bind(ROLE_USER)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn upsert_by_id(&self, user: &NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, is_verified, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    is_verified = EXCLUDED.is_verified,
                    updated_at = now()
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.is_verified)
        .bind(ROLE_USER)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn touch(&self, id: &str, is_verified: Option<bool>) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET last_active_date = now(),
                is_verified = COALESCE($2, is_verified),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_verified)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn sync(
        &self,
        id: &str,
        email: Option<&str>,
        is_verified: bool,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                is_verified = $3,
                last_active_date = now(),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(is_verified)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_email(&self, id: &str, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET email = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
