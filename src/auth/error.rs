//! Domain errors for credential and reset-token operations

use thiserror::Error;

use super::tokens::TokenError;
use crate::notifications::NotificationError;
use crate::oauth::OAuthError;
use crate::store::StoreError;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    Unauthenticated,
    NotFound,
    UpstreamFailure,
    Internal,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password must be at least 8 characters")]
    WeakPassword,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("email is already registered")]
    EmailExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("password reset token not found")]
    ResetTokenNotFound,

    #[error("password reset token has expired")]
    ResetTokenExpired,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("notification failed: {0}")]
    Notification(#[from] NotificationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::WeakPassword | AuthError::InvalidEmail | AuthError::ResetTokenExpired => {
                ErrorKind::InvalidInput
            }
            AuthError::EmailExists => ErrorKind::Conflict,
            AuthError::InvalidCredentials => ErrorKind::Unauthenticated,
            AuthError::Token(e) => match e {
                TokenError::Expired | TokenError::Invalid => ErrorKind::Unauthenticated,
                TokenError::Signing(_) | TokenError::Config(_) => ErrorKind::Internal,
            },
            AuthError::UserNotFound | AuthError::ResetTokenNotFound => ErrorKind::NotFound,
            AuthError::OAuth(e) => e.kind(),
            AuthError::PasswordHash(_) | AuthError::Notification(_) => ErrorKind::Internal,
            AuthError::Store(_) => ErrorKind::Internal,
        }
    }
}
