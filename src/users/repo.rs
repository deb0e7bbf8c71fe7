use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{model::Role, repo_types::UserRow, UserRecord};

/// A unique field already belongs to another account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is already taken")]
pub struct ConflictError {
    pub field: &'static str,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for user records. Implementations enforce email and username
/// uniqueness atomically at write time.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &UserRecord) -> Result<Uuid, RepoError>;
    async fn update(&self, user: &UserRecord) -> Result<(), RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn role_names(user: &UserRecord) -> Json<Vec<Role>> {
    Json(user.stored_roles().iter().copied().collect())
}

fn map_write_error(e: sqlx::Error) -> RepoError {
    if let Some(db_err) = e.as_database_error() {
        // 23505 = PostgreSQL unique violation
        if db_err.code().as_deref() == Some("23505") {
            let field = match db_err.constraint() {
                Some("uniq_users_username") => "username",
                _ => "email",
            };
            return RepoError::Conflict(ConflictError { field });
        }
    }
    RepoError::Database(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, user), fields(email = ?user.email()))]
    async fn insert(&self, user: &UserRecord) -> Result<Uuid, RepoError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (email, username, roles, password_hash, created_at, updated_at, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user.email())
        .bind(user.username())
        .bind(role_names(user))
        .bind(user.password_hash())
        .bind(user.created_at())
        .bind(user.updated_at())
        .bind(user.is_verified())
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)?;
        debug!(%id, "user row inserted");
        Ok(id)
    }

    #[instrument(skip(self, user), fields(id = ?user.id()))]
    async fn update(&self, user: &UserRecord) -> Result<(), RepoError> {
        let id = user.id().ok_or(RepoError::NotFound)?;
        let result = sqlx::query(
            r#"
            UPDATE users
               SET email = $2, username = $3, roles = $4, password_hash = $5,
                   updated_at = $6, is_verified = $7
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user.email())
        .bind(user.username())
        .bind(role_names(user))
        .bind(user.password_hash())
        .bind(user.updated_at())
        .bind(user.is_verified())
        .execute(&self.db)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, roles, password_hash, created_at, updated_at, is_verified
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, roles, password_hash, created_at, updated_at, is_verified
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, roles, password_hash, created_at, updated_at, is_verified
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserRecord::from))
    }
}
