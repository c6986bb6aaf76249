//! Password-reset tokens
//!
//! A token is valid while `created_at + ttl >= now`. Looking one up does not
//! consume it; only `complete_reset` deletes the row, and `sweep` clears out
//! whatever was never used.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::models::{ResetToken, User};
use super::service::CredentialService;
use crate::common::{safe_email_log, safe_token_log};
use crate::notifications::{DeliveryHandle, NotificationSink};
use crate::store::{CredentialStore, StoreError};

#[derive(Clone)]
pub struct ResetTokenService {
    store: Arc<dyn CredentialStore>,
    credentials: CredentialService,
}

impl ResetTokenService {
    pub fn new(store: Arc<dyn CredentialStore>, credentials: CredentialService) -> Self {
        Self { store, credentials }
    }

    /// Unknown emails fail with `UserNotFound`.
    pub async fn create(&self, email: &str) -> Result<ResetToken, AuthError> {
        let user = self.credentials.user_by_email(email).await?;
        self.create_for(&user).await
    }

    async fn create_for(&self, user: &User) -> Result<ResetToken, AuthError> {
        let token = ResetToken {
            token: Uuid::new_v4(),
            user_id: user.id,
            // stored with millisecond precision
            created_at: Utc::now().trunc_subsecs(3),
        };
        self.store.create_reset_token(&token).await?;

        info!(user_id = %user.id, "Password reset token created");
        Ok(token)
    }

    pub async fn resolve_user(&self, token_id: Uuid, ttl: Duration) -> Result<Uuid, AuthError> {
        self.resolve_user_at(token_id, ttl, Utc::now()).await
    }

    pub async fn resolve_user_at(
        &self,
        token_id: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuthError> {
        let token = self.store.find_reset_token(token_id).await.map_err(|e| match e {
            StoreError::NotFound => AuthError::ResetTokenNotFound,
            other => AuthError::Store(other),
        })?;

        // an expiry past the representable range never passes
        let expired = token
            .created_at
            .checked_add_signed(ttl)
            .is_some_and(|expires| expires < now);
        if expired {
            debug!(
                token = %safe_token_log(&token_id.to_string()),
                "Password reset token expired"
            );
            return Err(AuthError::ResetTokenExpired);
        }

        Ok(token.user_id)
    }

    /// Removes every token created strictly before `older_than`.
    pub async fn sweep(&self, older_than: DateTime<Utc>) -> Result<u64, AuthError> {
        Ok(self.store.sweep_reset_tokens(older_than).await?)
    }

    /// The forgot-password flow: create a token and hand it to the sink.
    pub async fn request_password_reset(
        &self,
        email: &str,
        sink: &dyn NotificationSink,
    ) -> Result<(ResetToken, DeliveryHandle), AuthError> {
        let user = self.credentials.user_by_email(email).await?;
        let token = self.create_for(&user).await?;
        let handle = sink.send_password_reset_email(&user.email, &token).await?;

        info!(
            email = %safe_email_log(&user.email),
            delivery = handle.0,
            "Password reset email enqueued"
        );
        Ok((token, handle))
    }

    /// Sets a new password for the token's owner and consumes the token.
    pub async fn complete_reset(
        &self,
        token_id: Uuid,
        ttl: Duration,
        new_password: &str,
    ) -> Result<Uuid, AuthError> {
        let user_id = self.resolve_user(token_id, ttl).await?;
        self.credentials.set_password(user_id, new_password).await?;

        match self.store.delete_reset_token(token_id).await {
            Ok(()) => {}
            // consumed concurrently; the password is already set
            Err(StoreError::NotFound) => {
                debug!(user_id = %user_id, "Reset token already consumed")
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user_id, "Password reset completed");
        Ok(user_id)
    }
}

/// Periodically deletes reset tokens older than `ttl`. Failures are logged
/// and the loop keeps going.
pub fn start_sweep_task(
    service: ResetTokenService,
    ttl: Duration,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
                warn!("Reset token ttl out of range, skipping sweep");
                continue;
            };
            match service.sweep(cutoff).await {
                Ok(0) => {}
                Ok(deleted) => info!(deleted = deleted, "Swept expired password reset tokens"),
                Err(e) => error!(error = %e, "Password reset token sweep failed"),
            }
        }
    })
}
