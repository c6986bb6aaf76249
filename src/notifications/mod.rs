//! # Notifications Module
//!
//! Producer side of outbound email. The reset flow hands a token to a
//! `NotificationSink` and moves on; delivery belongs to whoever drains the sink.

pub mod outbox;
pub mod templates;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::models::ResetToken;

pub use outbox::OutboxNotificationSink;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Failed to enqueue message: {0}")]
    Enqueue(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Identifier of the enqueued message (outbox row id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryHandle(pub i64);

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_password_reset_email(
        &self,
        recipient: &str,
        token: &ResetToken,
    ) -> Result<DeliveryHandle, NotificationError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every message in memory so tests can inspect what was sent.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(String, ResetToken)>>,
    }

    impl RecordingSink {
        pub fn sent(&self) -> Vec<(String, ResetToken)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send_password_reset_email(
            &self,
            recipient: &str,
            token: &ResetToken,
        ) -> Result<DeliveryHandle, NotificationError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push((recipient.to_string(), token.clone()));
            Ok(DeliveryHandle(sent.len() as i64))
        }
    }
}
