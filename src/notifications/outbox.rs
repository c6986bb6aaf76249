// src/notifications/outbox.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::templates::{
    generate_forgot_password_email, ForgotPasswordParams, FORGOT_PASSWORD_SUBJECT,
    FORGOT_PASSWORD_TEMPLATE,
};
use super::{DeliveryHandle, NotificationError, NotificationSink};
use crate::auth::models::ResetToken;
use crate::common::safe_email_log;

/// Writes outbound email into the `email_outbox` table; a separate mailer drains it.
#[derive(Debug, Clone)]
pub struct OutboxNotificationSink {
    db_pool: SqlitePool,
    reset_link_template: String,
}

impl OutboxNotificationSink {
    pub fn new(db_pool: SqlitePool, reset_link_template: impl Into<String>) -> Self {
        Self {
            db_pool,
            reset_link_template: reset_link_template.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for OutboxNotificationSink {
    async fn send_password_reset_email(
        &self,
        recipient: &str,
        token: &ResetToken,
    ) -> Result<DeliveryHandle, NotificationError> {
        let params = ForgotPasswordParams::new(&token.token.to_string(), &self.reset_link_template);
        let body_html = generate_forgot_password_email(&params);

        let result = sqlx::query(
            "INSERT INTO email_outbox (recipient, subject, template, params, body_html, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(recipient)
        .bind(FORGOT_PASSWORD_SUBJECT)
        .bind(FORGOT_PASSWORD_TEMPLATE)
        .bind(serde_json::to_string(&params)?)
        .bind(&body_html)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.db_pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            outbox_id = id,
            recipient = %safe_email_log(recipient),
            template = FORGOT_PASSWORD_TEMPLATE,
            "Queued password reset email"
        );

        Ok(DeliveryHandle(id))
    }
}
