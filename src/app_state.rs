//! Application state management.
//!
//! This module defines the shared state structure that gets passed to all
//! Axum handlers via the `State` extractor. The `AppState` contains shared
//! resources like database connections, the WebAuthn protocol handler, the
//! mailer, metrics, and the configured authentication lifetimes.
//!
//! The state is designed to be cheaply cloneable (using `Arc` internally
//! where needed) so it can be passed efficiently to each request handler
//! without expensive copying of resources. There is no other process-wide
//! mutable state: every request receives its dependencies through this
//! struct.

use crate::config::AuthConfig;
use crate::domain::{AuthError, AuthResult, MailerPtr, MetricsPtr, RepositoryPtr};
use redis::Client;
use std::sync::Arc;
use std::time::Duration;
use webauthn_rs::Webauthn;

/// Shared application state passed to all Axum handlers.
///
/// This struct serves as the Dependency Injection container for the
/// application. It is built once at startup, attached to the router via
/// `.with_state(app_state)`, and cloned cheaply per request.
///
/// Handlers depend on the trait seams (`Repository`, `Mailer`, `Metrics`),
/// never on concrete backends.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Redis client for creating multiplexed async connections on demand.
    ///
    /// Used for ephemeral data: session records and in-flight ceremony
    /// challenges. Handlers call `get_conn()` per request.
    redis_client: Client,

    /// Metrics implementation for recording application events.
    metrics: MetricsPtr,

    /// Durable storage for users, credentials, and reset tokens.
    repository: RepositoryPtr,

    /// WebAuthn protocol handler, configured with the relying party
    /// identity. Wrapped in `Arc` because `Webauthn` does not implement
    /// `Clone`.
    webauthn: Arc<Webauthn>,

    /// Outbound email, used only for password reset links.
    mailer: MailerPtr,

    /// Challenge/session/reset-token lifetimes and the reset link base.
    auth: AuthConfig,
}

impl AppState {
    // ---

    pub fn new(
        redis_client: Client,
        metrics: MetricsPtr,
        repository: RepositoryPtr,
        webauthn: Arc<Webauthn>,
        mailer: MailerPtr,
        auth: AuthConfig,
    ) -> Self {
        // ---
        AppState {
            redis_client,
            metrics,
            repository,
            webauthn,
            mailer,
            auth,
        }
    }

    /// Creates a new multiplexed Redis connection.
    pub(crate) async fn get_conn(&self) -> AuthResult<redis::aio::MultiplexedConnection> {
        // ---
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(AuthError::Cache)
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        // ---
        &self.metrics
    }

    /// Get a reference to the repository implementation.
    pub(crate) fn repository(&self) -> &RepositoryPtr {
        // ---
        &self.repository
    }

    /// Get a reference to the WebAuthn instance.
    pub(crate) fn webauthn(&self) -> &Webauthn {
        // ---
        &self.webauthn
    }

    /// Get a reference to the mailer implementation.
    pub(crate) fn mailer(&self) -> &MailerPtr {
        // ---
        &self.mailer
    }

    /// Get the ceremony challenge TTL.
    pub(crate) fn challenge_ttl(&self) -> Duration {
        // ---
        self.auth.challenge_ttl
    }

    /// Get the session TTL.
    pub(crate) fn session_ttl(&self) -> Duration {
        // ---
        self.auth.session_ttl
    }

    /// Get the reset token TTL.
    pub(crate) fn reset_token_ttl(&self) -> Duration {
        // ---
        self.auth.reset_token_ttl
    }

    /// Base URL for password reset links.
    pub(crate) fn reset_link_base(&self) -> &str {
        // ---
        &self.auth.reset_link_base
    }
}

#[cfg(test)]
mod tests {
    // ---

    use super::*;
    use crate::config::WebAuthnConfig;
    use crate::create_webauthn;
    use crate::domain::{AuthResult, Credential, Mailer, PasswordResetToken, Repository, User};
    use uuid::Uuid;

    // Mock repository for unit tests - not used, just satisfies AppState requirements
    struct MockRepository;

    #[async_trait::async_trait]
    impl Repository for MockRepository {
        // ---

        async fn create_user(&self, _user: &User) -> AuthResult<()> {
            unimplemented!("Mock repository - not used in AppState unit tests")
        }
        async fn create_user_with_credential(
            &self,
            _user: &User,
            _credential: &Credential,
        ) -> AuthResult<()> {
            unimplemented!()
        }
        async fn get_user_by_username(&self, _username: &str) -> AuthResult<Option<User>> {
            unimplemented!()
        }
        async fn get_user_by_email(&self, _email: &str) -> AuthResult<Option<User>> {
            unimplemented!()
        }
        async fn get_user_by_id(&self, _user_id: Uuid) -> AuthResult<Option<User>> {
            unimplemented!()
        }
        async fn set_password_hash(&self, _user_id: Uuid, _hash: &str) -> AuthResult<()> {
            unimplemented!()
        }
        async fn save_credential(&self, _credential: &Credential) -> AuthResult<()> {
            unimplemented!()
        }
        async fn get_credentials_by_user(&self, _user_id: Uuid) -> AuthResult<Vec<Credential>> {
            unimplemented!()
        }
        async fn get_credential_by_id(
            &self,
            _credential_id: &[u8],
        ) -> AuthResult<Option<Credential>> {
            unimplemented!()
        }
        async fn advance_credential_counter(
            &self,
            _credential_id: &[u8],
            _expected_counter: i64,
            _new_counter: i64,
        ) -> AuthResult<bool> {
            unimplemented!()
        }
        async fn touch_credential(&self, _credential_id: &[u8]) -> AuthResult<()> {
            unimplemented!()
        }
        async fn delete_credential(&self, _credential_id: &[u8]) -> AuthResult<()> {
            unimplemented!()
        }
        async fn upsert_reset_token(&self, _token: &PasswordResetToken) -> AuthResult<()> {
            unimplemented!()
        }
        async fn consume_reset_token(
            &self,
            _token: &str,
        ) -> AuthResult<Option<PasswordResetToken>> {
            unimplemented!()
        }
    }

    struct MockMailer;

    #[async_trait::async_trait]
    impl Mailer for MockMailer {
        // ---
        async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> bool {
            true
        }
    }

    fn test_webauthn_config() -> WebAuthnConfig {
        // ---
        WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Test App".to_string(),
            origin: "http://localhost:8080".to_string(),
        }
    }

    fn test_auth_config() -> AuthConfig {
        // ---
        AuthConfig {
            challenge_ttl: Duration::from_secs(300),
            session_ttl: Duration::from_secs(3600),
            reset_token_ttl: Duration::from_secs(3600),
            reset_link_base: "http://localhost:8080/reset".to_string(),
        }
    }

    fn test_app_state(redis_url: &str) -> AppState {
        // ---
        let redis_client = Client::open(redis_url).unwrap();
        let metrics = crate::infrastructure::create_noop_metrics().unwrap();
        let repository = Arc::new(MockRepository);
        let webauthn = Arc::new(create_webauthn(&test_webauthn_config()).unwrap());

        AppState::new(
            redis_client,
            metrics,
            repository,
            webauthn,
            Arc::new(MockMailer),
            test_auth_config(),
        )
    }

    #[test]
    fn test_app_state_creation_and_clone() {
        // ---
        // Test basic creation and that Clone works
        let app_state = test_app_state("redis://127.0.0.1:6379");
        let _cloned = app_state.clone();

        // Verify accessors work
        let _metrics_ref = app_state.metrics();
        let _repo_ref = app_state.repository();
        let _webauthn_ref = app_state.webauthn();
        let _mailer_ref = app_state.mailer();
        assert_eq!(app_state.challenge_ttl(), Duration::from_secs(300));
        assert_eq!(app_state.reset_token_ttl(), Duration::from_secs(3600));
        assert_eq!(app_state.reset_link_base(), "http://localhost:8080/reset");
    }

    #[tokio::test]
    async fn test_redis_connection_failure() {
        // ---
        // Test that connection failures return proper error
        let app_state = test_app_state("redis://invalid-host:6379");

        let result = app_state.get_conn().await;
        assert!(matches!(result, Err(AuthError::Cache(_))));
    }
}
