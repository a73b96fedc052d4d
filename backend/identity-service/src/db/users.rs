/// PostgreSQL-backed user store for identity-service
use super::{CredentialStore, StoreError};
use crate::models::{NewUser, ProfileUpdate, User};
use async_trait::async_trait;
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, first_name, last_name, username, email, password_hash, \
                            is_active, is_admin, created_at, updated_at";

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::AlreadyExists
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_one(&self, filter: &str, arg: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(arg)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

/// Mutations keyed by id touch exactly one row or the id does not exist
fn expect_one_row(result: PgQueryResult) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn save(&self, user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (first_name, last_name, username, email, password_hash, is_active, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        let saved = sqlx::query_as::<_, User>(&query)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_active)
            .bind(user.is_admin)
            .fetch_one(&self.pool)
            .await?;

        Ok(saved)
    }

    async fn find(&self, id: i32) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update(&self, id: i32, profile: ProfileUpdate) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .execute(&self.pool)
        .await?;

        expect_one_row(result)
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one_row(result)
    }

    async fn update_password(&self, id: i32, password_hash: String) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(&password_hash)
                .execute(&self.pool)
                .await?;

        expect_one_row(result)
    }

    async fn toggle_admin(&self, id: i32) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET is_admin = NOT is_admin, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        expect_one_row(result)
    }

    async fn toggle_active(&self, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_one_row(result)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("email", email).await
    }
}
