//! Registration, login and account maintenance
//!
//! Email addresses are normalized (trimmed, lowercased) before they reach the
//! store; the store's case-insensitive unique index is the final word on
//! duplicates.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::models::User;
use super::password::{check_password_strength, HashingPool};
use super::tokens::TokenAuthority;
use crate::common::helpers::normalize_email;
use crate::common::safe_email_log;
use crate::common::validation::is_valid_email;
use crate::oauth::{IdentityProfile, OAuthError};
use crate::store::{CredentialStore, NewUser, StoreError};

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenAuthority>,
    hasher: HashingPool,
}

/// Store lookups where a missing row means the user is gone.
fn user_lookup(e: StoreError) -> AuthError {
    match e {
        StoreError::NotFound => AuthError::UserNotFound,
        other => AuthError::Store(other),
    }
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenAuthority>,
        hasher: HashingPool,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }

    /// Creates an account. Does not issue a session token.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<User, AuthError> {
        check_password_strength(password)?;

        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        match self.store.find_user_by_email(&email).await {
            Ok(_) => {
                warn!(email = %safe_email_log(&email), "Registration rejected: email exists");
                return Err(AuthError::EmailExists);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .store
            .create_user(NewUser {
                id: Uuid::new_v4(),
                email,
                name: name.filter(|n| !n.trim().is_empty()),
                password_hash: Some(password_hash),
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent registration
                StoreError::Conflict => AuthError::EmailExists,
                other => AuthError::Store(other),
            })?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "User registered"
        );
        Ok(user)
    }

    /// Every failure mode answers `InvalidCredentials` so callers cannot
    /// tell a missing account from a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), AuthError> {
        let email = normalize_email(email);
        let user = match self.store.find_user_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                debug!(email = %safe_email_log(&email), "Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(hash) = user.password_hash.as_deref() else {
            debug!(user_id = %user.id, "Login failed: account has no password");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, hash).await? {
            debug!(user_id = %user.id, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "User logged in");
        Ok((token, user))
    }

    /// Issues a token without a password check. Only for callers that
    /// authenticated the user some other way.
    pub async fn login_by_id(&self, user_id: Uuid) -> Result<(String, User), AuthError> {
        let user = self.store.find_user_by_id(user_id).await.map_err(user_lookup)?;
        let token = self.tokens.issue(user.id, &user.email)?;
        Ok((token, user))
    }

    /// Verifies the token and re-resolves the user it names.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token)?;
        self.store
            .find_user_by_id(claims.sub)
            .await
            .map_err(user_lookup)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store.find_user_by_id(user_id).await.map_err(user_lookup)
    }

    pub async fn update_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.profile(user_id).await?;

        let matches = match user.password_hash.as_deref() {
            Some(hash) => self.hasher.verify(old_password, hash).await?,
            None => false,
        };
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        check_password_strength(new_password)?;
        let hash = self.hasher.hash(new_password).await?;
        self.store
            .update_password_hash(user_id, &hash)
            .await
            .map_err(user_lookup)?;

        info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    pub async fn update_email(&self, user_id: Uuid, new_email: &str) -> Result<(), AuthError> {
        let email = normalize_email(new_email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        self.store
            .update_email(user_id, &email)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::UserNotFound,
                StoreError::Conflict => AuthError::EmailExists,
                other => AuthError::Store(other),
            })?;

        info!(user_id = %user_id, email = %safe_email_log(&email), "Email updated");
        Ok(())
    }

    /// Maps a provider profile onto a local account, creating a
    /// password-less one on first login.
    pub async fn login_with_identity(
        &self,
        profile: &IdentityProfile,
    ) -> Result<(String, User), AuthError> {
        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| OAuthError::NoEmailAvailable {
                provider: profile.provider.clone(),
            })?;

        let user = match self.store.find_user_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                let name = Some(profile.name.clone()).filter(|n| !n.trim().is_empty());
                let created = self
                    .store
                    .create_user(NewUser {
                        id: Uuid::new_v4(),
                        email: email.clone(),
                        name,
                        password_hash: None,
                    })
                    .await;

                match created {
                    Ok(user) => {
                        info!(
                            user_id = %user.id,
                            email = %safe_email_log(&email),
                            provider = %profile.provider,
                            "Created user from identity provider"
                        );
                        user
                    }
                    // created concurrently by another callback; use that row
                    Err(StoreError::Conflict) => self.store.find_user_by_email(&email).await?,
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let token = self.tokens.issue(user.id, &user.email)?;
        info!(
            user_id = %user.id,
            provider = %profile.provider,
            has_password = user.has_password(),
            "User logged in via identity provider"
        );
        Ok((token, user))
    }

    pub async fn user_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.store
            .find_user_by_email(&normalize_email(email))
            .await
            .map_err(user_lookup)
    }

    /// Replaces the password without checking the old one.
    pub async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AuthError> {
        check_password_strength(new_password)?;
        let hash = self.hasher.hash(new_password).await?;
        self.store
            .update_password_hash(user_id, &hash)
            .await
            .map_err(user_lookup)?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store.delete_user(user_id).await.map_err(user_lookup)?;
        info!(user_id = %user_id, "Account deleted");
        Ok(())
    }
}
