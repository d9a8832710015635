//! User repository: the minimal slice of user management needed for uploader
//! summaries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filedock_core::models::{NewUser, User};
use filedock_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`AppError::DuplicateKey`] when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// All users, newest first.
    async fn list(&self) -> Result<Vec<User>, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar: self.avatar,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "users", db.operation = "insert"))]
    async fn create(&self, new: NewUser) -> Result<User, AppError> {
        let result = sqlx::query_as::<Postgres, UserRow>(
            r#"
            INSERT INTO users (name, email, avatar)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, avatar, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.avatar)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.to_domain()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::DuplicateKey(format!("A user with email {} already exists", new.email)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as::<Postgres, UserRow>(
            "SELECT id, name, email, avatar, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::to_domain))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<User>, AppError> {
        let rows: Vec<UserRow> = sqlx::query_as::<Postgres, UserRow>(
            "SELECT id, name, email, avatar, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserRow::to_domain).collect())
    }
}
