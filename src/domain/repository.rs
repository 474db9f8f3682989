use super::error::AuthResult;
use super::models::{Credential, PasswordResetToken, User};
use std::sync::Arc;
use uuid::Uuid;

/// Abstraction for durable authentication state: users, passkey
/// credentials, and password reset tokens.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    // ---
    /// Create a new user. Username/email uniqueness violations surface as
    /// `AuthError::DuplicateIdentity`.
    async fn create_user(&self, user: &User) -> AuthResult<()>;

    /// Create a user and their first credential in one transaction.
    /// Used by passkey registration so a verified ceremony either persists
    /// both records or neither.
    async fn create_user_with_credential(
        &self,
        user: &User,
        credential: &Credential,
    ) -> AuthResult<()>;

    /// Get user by username.
    async fn get_user_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Get user by email.
    async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Get user by ID.
    async fn get_user_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>>;

    /// Replace the user's password hash.
    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> AuthResult<()>;

    /// Save a new credential for an existing user.
    async fn save_credential(&self, credential: &Credential) -> AuthResult<()>;

    /// Get all credentials for a user.
    async fn get_credentials_by_user(&self, user_id: Uuid) -> AuthResult<Vec<Credential>>;

    /// Get a specific credential by its ID.
    async fn get_credential_by_id(&self, credential_id: &[u8]) -> AuthResult<Option<Credential>>;

    /// Advance the signature counter with a compare-and-set keyed on the
    /// previously observed value. Returns `false` when no row matched,
    /// meaning a concurrent verification already advanced the counter.
    async fn advance_credential_counter(
        &self,
        credential_id: &[u8],
        expected_counter: i64,
        new_counter: i64,
    ) -> AuthResult<bool>;

    /// Refresh `last_used_at` without touching the counter. Used for
    /// authenticators that never implement counters (always report zero).
    async fn touch_credential(&self, credential_id: &[u8]) -> AuthResult<()>;

    /// Delete a credential by its ID.
    async fn delete_credential(&self, credential_id: &[u8]) -> AuthResult<()>;

    /// Store a reset token, replacing any active token for the same user.
    async fn upsert_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()>;

    /// Atomically remove and return the token row. Exactly one concurrent
    /// caller can observe `Some`; everyone else sees `None`.
    async fn consume_reset_token(&self, token: &str) -> AuthResult<Option<PasswordResetToken>>;
}

/// Type alias for any backend that implements Repository.
pub type RepositoryPtr = Arc<dyn Repository>;
