// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::password::HashingPool;
use crate::auth::{CredentialService, ResetTokenService, TokenAuthority};
use crate::notifications::{NotificationSink, OutboxNotificationSink};
use crate::oauth::IdentityProviderRegistry;
use crate::store::{CredentialStore, SqliteCredentialStore};

/// Application state containing configuration and services.
///
/// Built once at startup and shared as `Arc<AppState>`; nothing in it is
/// mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tokens: Arc<TokenAuthority>,
    pub credentials: CredentialService,
    pub reset_tokens: ResetTokenService,
    pub providers: IdentityProviderRegistry,
    pub notifications: Arc<dyn NotificationSink>,
}

impl AppState {
    /// Wires the services around an explicit store, sink and registry.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        hasher: HashingPool,
        notifications: Arc<dyn NotificationSink>,
        providers: IdentityProviderRegistry,
    ) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenAuthority::new(config.token.clone())?);
        let credentials = CredentialService::new(store.clone(), tokens.clone(), hasher);
        let reset_tokens = ResetTokenService::new(store, credentials.clone());

        Ok(Self {
            config,
            tokens,
            credentials,
            reset_tokens,
            providers,
            notifications,
        })
    }

    /// Production wiring: sqlite store, outbox sink, providers from config.
    pub fn build(config: AppConfig, db: SqlitePool) -> anyhow::Result<Self> {
        let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(db.clone()));
        let notifications: Arc<dyn NotificationSink> = Arc::new(OutboxNotificationSink::new(
            db,
            config.password_reset_url.clone(),
        ));
        let providers = IdentityProviderRegistry::from_config(&config.oauth)?;
        let hasher = HashingPool::new(config.hash_concurrency);

        Self::from_parts(config, store, hasher, notifications, providers)
    }
}
