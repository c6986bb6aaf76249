// src/store/sqlite.rs
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{CredentialStore, NewUser, StoreError};
use crate::auth::models::{ResetToken, User};

#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    db_pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: Option<String>,
    password_hash: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct ResetTokenRow {
    token: String,
    user_id: String,
    created_at: i64,
}

impl TryFrom<ResetTokenRow> for ResetToken {
    type Error = StoreError;

    fn try_from(row: ResetTokenRow) -> Result<Self, Self::Error> {
        Ok(ResetToken {
            token: parse_uuid(&row.token)?,
            user_id: parse_uuid(&row.user_id)?,
            created_at: from_millis(row.created_at)?,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad uuid '{}': {}", raw, e)))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("bad timestamp {}", ms)))
}

/// Smallest stored millisecond value that is not strictly before `at`.
fn cutoff_millis(at: DateTime<Utc>) -> i64 {
    let millis = at.timestamp_millis();
    if at.timestamp_subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis + 1
    }
}

/// Unique-constraint failures become `Conflict`, everything else stays a database error.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
    }
    StoreError::Database(e)
}

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let millis = now.timestamp_millis();

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(user.name.as_deref())
        .bind(user.password_hash.as_deref())
        .bind(millis)
        .bind(millis)
        .execute(&self.db_pool)
        .await
        .map_err(map_write_error)?;

        debug!(user_id = %user.id, "Inserted user row");

        Ok(User {
            id: user.id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: from_millis(millis)?,
            updated_at: from_millis(millis)?,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.db_pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn update_email(&self, id: Uuid, email: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET email = ?, updated_at = ? WHERE id = ?")
            .bind(email)
            .bind(Utc::now().timestamp_millis())
            .bind(id.to_string())
            .execute(&self.db_pool)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(hash)
            .bind(Utc::now().timestamp_millis())
            .bind(id.to_string())
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_reset_token(&self, token: &ResetToken) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(token.token.to_string())
        .bind(token.user_id.to_string())
        .bind(token.created_at.timestamp_millis())
        .execute(&self.db_pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn find_reset_token(&self, token: Uuid) -> Result<ResetToken, StoreError> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT token, user_id, created_at FROM password_reset_tokens WHERE token = ?",
        )
        .bind(token.to_string())
        .fetch_optional(&self.db_pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn delete_reset_token(&self, token: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE token = ?")
            .bind(token.to_string())
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn sweep_reset_tokens(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE created_at < ?")
            .bind(cutoff_millis(older_than))
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected())
    }
}
