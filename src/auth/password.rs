//! Password hashing on a bounded blocking pool
//!
//! Argon2id hashing never runs on the async executor. Each call takes a
//! semaphore permit and then moves to `spawn_blocking`; the permit count
//! caps how many hashes run at once.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::error::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length is counted in characters, not bytes.
pub fn check_password_strength(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct HashingPool {
    permits: Arc<Semaphore>,
    params: Params,
}

impl HashingPool {
    pub fn new(concurrency: usize) -> Self {
        Self::with_params(concurrency, Params::default())
    }

    pub fn with_params(concurrency: usize, params: Params) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            params,
        }
    }

    /// Minimal cost parameters for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let params = Params::new(8, 1, 1, None).unwrap_or_default();
        Self::with_params(2, params)
    }

    /// Hash a password with Argon2id. Returns a PHC-format string.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let params = self.params.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::PasswordHash(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }

    /// Check a password against a stored PHC string. A mismatch is `Ok(false)`;
    /// a malformed stored hash is an error.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| AuthError::PasswordHash(format!("invalid stored hash: {}", e)))?;
            // cost parameters come from the PHC string itself
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength_counts_characters() {
        assert!(matches!(
            check_password_strength("short"),
            Err(AuthError::WeakPassword)
        ));
        assert!(check_password_strength("password123").is_ok());
        // 7 characters, 14 bytes
        assert!(check_password_strength("ééééééé").is_err());
        assert!(check_password_strength("éééééééé").is_ok());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let pool = HashingPool::for_tests();
        let hash = pool.hash("password123").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(pool.verify("password123", &hash).await.unwrap());
        assert!(!pool.verify("password124", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let pool = HashingPool::for_tests();
        let a = pool.hash("password123").await.unwrap();
        let b = pool.hash("password123").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_stored_hash_is_an_error() {
        let pool = HashingPool::for_tests();
        let result = pool.verify("password123", "not-a-phc-string").await;
        assert!(matches!(result, Err(AuthError::PasswordHash(_))));
    }
}
