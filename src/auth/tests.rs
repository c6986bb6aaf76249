//! Tests for auth module
//!
//! These tests drive the credential and reset services against an in-memory
//! sqlite store, plus a few end-to-end requests through the router.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::auth::models::{ResetToken, User};
    use crate::auth::password::HashingPool;
    use crate::auth::tokens::{SigningAlgorithm, TokenConfig, TokenError, DEFAULT_ISSUER};
    use crate::common::config::{AppConfig, OAuthConfig};
    use crate::common::migrations::test_pool;
    use crate::common::AppState;
    use crate::notifications::testing::RecordingSink;
    use crate::oauth::{IdentityProfile, IdentityProviderRegistry, OAuthError};
    use crate::store::{CredentialStore, SqliteCredentialStore};
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            token: TokenConfig {
                secret: "test_secret_key".to_string(),
                ttl: Duration::hours(1),
                algorithm: SigningAlgorithm::Hs256,
                issuer: DEFAULT_ISSUER.to_string(),
            },
            reset_token_ttl: Duration::hours(1),
            reset_sweep_interval: Duration::zero(),
            password_reset_url: "http://localhost:3000/reset-password/{token}".to_string(),
            hash_concurrency: 2,
            oauth: OAuthConfig::default(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }

    struct Harness {
        state: AppState,
        store: Arc<SqliteCredentialStore>,
        sink: Arc<RecordingSink>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(SqliteCredentialStore::new(test_pool().await));
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::from_parts(
            test_config(),
            store.clone(),
            HashingPool::for_tests(),
            sink.clone(),
            IdentityProviderRegistry::new(),
        )
        .expect("state");

        Harness { state, store, sink }
    }

    async fn register_alice(h: &Harness) -> User {
        h.state
            .credentials
            .register("alice@example.com", "password123", Some("Alice".to_string()))
            .await
            .expect("register alice")
    }

    // ------------------------------------------------------------------------
    // Registration and login
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_then_login() {
        let h = harness().await;
        let user = register_alice(&h).await;
        assert_eq!(user.email, "alice@example.com");
        assert!(user.has_password());

        let (token, logged_in) = h
            .state
            .credentials
            .login("alice@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let claims = h.state.tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "alice@example.com");

        let resolved = h.state.credentials.validate_token(&token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let h = harness().await;
        let user = h
            .state
            .credentials
            .register("  Alice@Example.COM ", "password123", None)
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");

        // login accepts any casing of the stored address
        assert!(h
            .state
            .credentials
            .login("ALICE@example.com", "password123")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let h = harness().await;
        register_alice(&h).await;

        let dup = h
            .state
            .credentials
            .register("ALICE@example.com", "password123", None)
            .await;
        assert!(matches!(dup, Err(AuthError::EmailExists)));

        // password strength is checked before the email
        let weak = h.state.credentials.register("not-an-email", "short", None).await;
        assert!(matches!(weak, Err(AuthError::WeakPassword)));

        let bad_email = h
            .state
            .credentials
            .register("not-an-email", "password123", None)
            .await;
        assert!(matches!(bad_email, Err(AuthError::InvalidEmail)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = harness().await;
        register_alice(&h).await;

        let wrong_password = h
            .state
            .credentials
            .login("alice@example.com", "wrong-password")
            .await
            .unwrap_err();
        let unknown_email = h
            .state
            .credentials
            .login("nobody@example.com", "password123")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_validate_token_for_deleted_user() {
        let h = harness().await;
        let user = register_alice(&h).await;
        let (token, _) = h.state.credentials.login_by_id(user.id).await.unwrap();

        h.state.credentials.delete_account(user.id).await.unwrap();

        let result = h.state.credentials.validate_token(&token).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_validate_token_rejects_garbage() {
        let h = harness().await;
        let result = h.state.credentials.validate_token("not.a.token").await;
        assert!(matches!(result, Err(AuthError::Token(TokenError::Invalid))));
    }

    // ------------------------------------------------------------------------
    // Account changes
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_update_password() {
        let h = harness().await;
        let user = register_alice(&h).await;

        let wrong_old = h
            .state
            .credentials
            .update_password(user.id, "wrong-password", "newpassword1")
            .await;
        assert!(matches!(wrong_old, Err(AuthError::InvalidCredentials)));

        let weak_new = h
            .state
            .credentials
            .update_password(user.id, "password123", "short")
            .await;
        assert!(matches!(weak_new, Err(AuthError::WeakPassword)));

        h.state
            .credentials
            .update_password(user.id, "password123", "newpassword1")
            .await
            .unwrap();

        assert!(h
            .state
            .credentials
            .login("alice@example.com", "password123")
            .await
            .is_err());
        assert!(h
            .state
            .credentials
            .login("alice@example.com", "newpassword1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_email() {
        let h = harness().await;
        let alice = register_alice(&h).await;
        h.state
            .credentials
            .register("bob@example.com", "password123", None)
            .await
            .unwrap();

        let taken = h.state.credentials.update_email(alice.id, "BOB@example.com").await;
        assert!(matches!(taken, Err(AuthError::EmailExists)));

        let invalid = h.state.credentials.update_email(alice.id, "nope").await;
        assert!(matches!(invalid, Err(AuthError::InvalidEmail)));

        let missing = h
            .state
            .credentials
            .update_email(Uuid::new_v4(), "carol@example.com")
            .await;
        assert!(matches!(missing, Err(AuthError::UserNotFound)));

        h.state
            .credentials
            .update_email(alice.id, "Alice.New@example.com")
            .await
            .unwrap();
        let profile = h.state.credentials.profile(alice.id).await.unwrap();
        assert_eq!(profile.email, "alice.new@example.com");
    }

    #[tokio::test]
    async fn test_delete_account_twice() {
        let h = harness().await;
        let user = register_alice(&h).await;

        h.state.credentials.delete_account(user.id).await.unwrap();
        let again = h.state.credentials.delete_account(user.id).await;
        assert!(matches!(again, Err(AuthError::UserNotFound)));
    }

    // ------------------------------------------------------------------------
    // Identity provider logins
    // ------------------------------------------------------------------------

    fn github_profile(email: Option<&str>) -> IdentityProfile {
        IdentityProfile {
            provider: "github".to_string(),
            id: "583231".to_string(),
            email: email.map(str::to_string),
            name: "The Octocat".to_string(),
            picture: None,
            username: Some("octocat".to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_with_identity_creates_passwordless_user() {
        let h = harness().await;
        let profile = github_profile(Some("Octocat@GitHub.com"));

        let (token, user) = h.state.credentials.login_with_identity(&profile).await.unwrap();
        assert_eq!(user.email, "octocat@github.com");
        assert_eq!(user.name.as_deref(), Some("The Octocat"));
        assert!(!user.has_password());
        assert_eq!(h.state.tokens.verify(&token).unwrap().sub, user.id);

        // second login maps onto the same account
        let (_, again) = h.state.credentials.login_with_identity(&profile).await.unwrap();
        assert_eq!(again.id, user.id);

        // no password to log in with
        let password_login = h
            .state
            .credentials
            .login("octocat@github.com", "password123")
            .await;
        assert!(matches!(password_login, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_with_identity_links_existing_account() {
        let h = harness().await;
        let alice = register_alice(&h).await;

        let (_, user) = h
            .state
            .credentials
            .login_with_identity(&github_profile(Some("alice@example.com")))
            .await
            .unwrap();
        assert_eq!(user.id, alice.id);
        assert!(user.has_password());
    }

    #[tokio::test]
    async fn test_login_with_identity_requires_email() {
        let h = harness().await;
        let result = h.state.credentials.login_with_identity(&github_profile(None)).await;
        assert!(matches!(
            result,
            Err(AuthError::OAuth(OAuthError::NoEmailAvailable { .. }))
        ));
    }

    // ------------------------------------------------------------------------
    // Password reset
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_request_password_reset_records_delivery() {
        let h = harness().await;
        let user = register_alice(&h).await;

        let (token, handle) = h
            .state
            .reset_tokens
            .request_password_reset("alice@example.com", h.sink.as_ref())
            .await
            .unwrap();
        assert_eq!(token.user_id, user.id);
        assert_eq!(handle.0, 1);

        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].1.token, token.token);

        let unknown = h
            .state
            .reset_tokens
            .request_password_reset("nobody@example.com", h.sink.as_ref())
            .await;
        assert!(matches!(unknown, Err(AuthError::UserNotFound)));
        assert_eq!(h.sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_email_goes_to_stored_address() {
        let h = harness().await;
        register_alice(&h).await;

        h.state
            .reset_tokens
            .request_password_reset("  ALICE@Example.com ", h.sink.as_ref())
            .await
            .unwrap();

        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
    }

    #[tokio::test]
    async fn test_resolve_user_with_unrepresentable_expiry() {
        let h = harness().await;
        let user = register_alice(&h).await;
        let token = h.state.reset_tokens.create("alice@example.com").await.unwrap();

        let resolved = h
            .state
            .reset_tokens
            .resolve_user(token.token, Duration::days(100_000_000))
            .await
            .unwrap();
        assert_eq!(resolved, user.id);
    }

    #[tokio::test]
    async fn test_resolve_user_honors_ttl_boundary() {
        let h = harness().await;
        let user = register_alice(&h).await;
        let token = h.state.reset_tokens.create("alice@example.com").await.unwrap();
        let ttl = Duration::hours(1);

        let just_inside = token.created_at + ttl - Duration::seconds(1);
        let at_limit = token.created_at + ttl;
        let just_outside = token.created_at + ttl + Duration::seconds(1);

        let resolved = h
            .state
            .reset_tokens
            .resolve_user_at(token.token, ttl, just_inside)
            .await
            .unwrap();
        assert_eq!(resolved, user.id);

        assert!(h
            .state
            .reset_tokens
            .resolve_user_at(token.token, ttl, at_limit)
            .await
            .is_ok());

        let expired = h
            .state
            .reset_tokens
            .resolve_user_at(token.token, ttl, just_outside)
            .await;
        assert!(matches!(expired, Err(AuthError::ResetTokenExpired)));

        // lookups are read-only
        assert!(h.state.reset_tokens.resolve_user(token.token, ttl).await.is_ok());
        assert!(h.state.reset_tokens.resolve_user(token.token, ttl).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_unknown_token() {
        let h = harness().await;
        let result = h
            .state
            .reset_tokens
            .resolve_user(Uuid::new_v4(), Duration::hours(1))
            .await;
        assert!(matches!(result, Err(AuthError::ResetTokenNotFound)));
    }

    #[tokio::test]
    async fn test_complete_reset_consumes_token() {
        let h = harness().await;
        let user = register_alice(&h).await;
        let token = h.state.reset_tokens.create("alice@example.com").await.unwrap();
        let ttl = Duration::hours(1);

        let weak = h
            .state
            .reset_tokens
            .complete_reset(token.token, ttl, "short")
            .await;
        assert!(matches!(weak, Err(AuthError::WeakPassword)));

        let reset_for = h
            .state
            .reset_tokens
            .complete_reset(token.token, ttl, "brandnewpass")
            .await
            .unwrap();
        assert_eq!(reset_for, user.id);

        assert!(h
            .state
            .credentials
            .login("alice@example.com", "brandnewpass")
            .await
            .is_ok());

        let reused = h
            .state
            .reset_tokens
            .complete_reset(token.token, ttl, "anotherpass")
            .await;
        assert!(matches!(reused, Err(AuthError::ResetTokenNotFound)));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_tokens() {
        let h = harness().await;
        let user = register_alice(&h).await;
        let now = Utc::now();

        let stale = ResetToken {
            token: Uuid::new_v4(),
            user_id: user.id,
            created_at: now - Duration::hours(2),
        };
        h.store.create_reset_token(&stale).await.unwrap();
        let fresh = h.state.reset_tokens.create("alice@example.com").await.unwrap();

        let deleted = h
            .state
            .reset_tokens
            .sweep(now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        assert!(h.store.find_reset_token(stale.token).await.is_err());
        assert!(h.store.find_reset_token(fresh.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_deleting_user_drops_reset_tokens() {
        let h = harness().await;
        let user = register_alice(&h).await;
        let token = h.state.reset_tokens.create("alice@example.com").await.unwrap();

        h.state.credentials.delete_account(user.id).await.unwrap();

        let result = h
            .state
            .reset_tokens
            .resolve_user(token.token, Duration::hours(1))
            .await;
        assert!(matches!(result, Err(AuthError::ResetTokenNotFound)));
    }

    // ------------------------------------------------------------------------
    // HTTP surface
    // ------------------------------------------------------------------------

    mod http {
        use super::*;
        use axum::{
            body::{to_bytes, Body},
            http::{header, Method, Request, StatusCode},
            Router,
        };
        use serde_json::{json, Value};
        use tower::ServiceExt;

        async fn app() -> (Router, Harness) {
            let h = harness().await;
            let router = crate::build_router(Arc::new(h.state.clone()));
            (router, h)
        }

        fn json_request(method: Method, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = bearer {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            builder.body(Body::from(body.to_string())).unwrap()
        }

        fn get_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
            let mut builder = Request::builder().uri(uri);
            if let Some(token) = bearer {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            builder.body(Body::empty()).unwrap()
        }

        async fn body_json(response: axum::response::Response) -> Value {
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        #[tokio::test]
        async fn test_health() {
            let (router, _h) = app().await;
            let response = router.oneshot(get_request("/health", None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_register_and_me() {
            let (router, _h) = app().await;

            let response = router
                .clone()
                .oneshot(json_request(
                    Method::POST,
                    "/auth/register",
                    json!({ "email": "alice@example.com", "password": "password123", "name": "Alice" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = body_json(response).await;
            assert_eq!(body["user"]["email"], "alice@example.com");
            assert!(body["user"].get("password_hash").is_none());
            let token = body["token"].as_str().unwrap().to_string();

            let response = router
                .clone()
                .oneshot(get_request("/auth/me", Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["name"], "Alice");

            let response = router
                .oneshot(json_request(
                    Method::POST,
                    "/auth/register",
                    json!({ "email": "ALICE@example.com", "password": "password123" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CONFLICT);
            assert_eq!(body_json(response).await["code"], "CONFLICT");
        }

        #[tokio::test]
        async fn test_login_failure_is_unauthorized() {
            let (router, h) = app().await;
            register_alice(&h).await;

            let response = router
                .oneshot(json_request(
                    Method::POST,
                    "/auth/login",
                    json!({ "email": "alice@example.com", "password": "wrong-password" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
        }

        #[tokio::test]
        async fn test_me_requires_bearer_token() {
            let (router, _h) = app().await;

            let missing = router
                .clone()
                .oneshot(get_request("/auth/me", None))
                .await
                .unwrap();
            assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

            let garbage = router
                .oneshot(get_request("/auth/me", Some("garbage")))
                .await
                .unwrap();
            assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
        }

        #[tokio::test]
        async fn test_expired_token_has_distinct_code() {
            let (router, h) = app().await;
            let user = register_alice(&h).await;
            let issued = Utc::now() - Duration::hours(2);
            let token = h.state.tokens.issue_at(user.id, &user.email, issued).unwrap();

            let response = router
                .oneshot(get_request("/auth/me", Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(response).await["code"], "TOKEN_EXPIRED");
        }

        #[tokio::test]
        async fn test_password_reset_flow() {
            let (router, h) = app().await;
            register_alice(&h).await;

            let response = router
                .clone()
                .oneshot(json_request(
                    Method::POST,
                    "/auth/forgot-password",
                    json!({ "email": "alice@example.com" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
            let reset = h.sink.sent()[0].1.token.to_string();

            let response = router
                .clone()
                .oneshot(get_request(
                    &format!("/auth/receive-password-reset-token/{}", reset),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["user"]["email"], "alice@example.com");

            let response = router
                .clone()
                .oneshot(json_request(
                    Method::POST,
                    "/auth/reset-password",
                    json!({ "token": reset, "new_password": "brandnewpass" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);

            let response = router
                .oneshot(json_request(
                    Method::POST,
                    "/auth/login",
                    json!({ "email": "alice@example.com", "password": "brandnewpass" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_reset_token_errors() {
            let (router, _h) = app().await;

            let malformed = router
                .clone()
                .oneshot(get_request("/auth/receive-password-reset-token/not-a-uuid", None))
                .await
                .unwrap();
            assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

            let unknown = router
                .clone()
                .oneshot(get_request(
                    &format!("/auth/receive-password-reset-token/{}", Uuid::new_v4()),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

            let unknown_email = router
                .oneshot(json_request(
                    Method::POST,
                    "/auth/forgot-password",
                    json!({ "email": "nobody@example.com" }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(unknown_email.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_delete_account() {
            let (router, h) = app().await;
            let user = register_alice(&h).await;
            let (token, _) = h.state.credentials.login_by_id(user.id).await.unwrap();

            let response = router
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::DELETE)
                        .uri("/auth/me")
                        .header(header::AUTHORIZATION, format!("Bearer {}", token))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);

            // the token still verifies but names nobody
            let response = router
                .oneshot(get_request("/auth/me", Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
