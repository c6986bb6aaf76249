//! # Store Module
//!
//! Repository contract for users and password-reset tokens, plus the sqlite
//! implementation used by the service.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::{ResetToken, User};

pub use sqlite::SqliteCredentialStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Fields for a user that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

/// Emails are passed in already normalized; the store compares them
/// case-insensitively regardless.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<User, StoreError>;
    async fn update_email(&self, id: Uuid, email: &str) -> Result<(), StoreError>;
    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    async fn create_reset_token(&self, token: &ResetToken) -> Result<(), StoreError>;
    async fn find_reset_token(&self, token: Uuid) -> Result<ResetToken, StoreError>;
    async fn delete_reset_token(&self, token: Uuid) -> Result<(), StoreError>;
    /// Deletes every token with `created_at < older_than` and returns how many went.
    async fn sweep_reset_tokens(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;
}
