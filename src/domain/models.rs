use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account identity. Every user carries at least one authentication
/// method once registration completes: a password hash, a passkey, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // ---
    pub id: Uuid,
    pub username: String,

    /// Optional, but unique when present. Required for password login and
    /// password reset delivery.
    pub email: Option<String>,

    /// Argon2id PHC string. `None` for passkey-only accounts.
    pub password_hash: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl User {
    // ---
    pub fn new(username: String, email: Option<String>, password_hash: Option<String>) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// A passkey (public-key credential) bound to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    // ---
    /// Credential ID reported by the authenticator. Globally unique, used
    /// as the lookup key.
    pub id: Vec<u8>,

    /// Owning user.
    pub user_id: Uuid,

    /// Serialized webauthn-rs `Passkey` (public key material).
    pub public_key: Vec<u8>,

    /// Monotonic signature counter. Authenticators report u32 values, so
    /// the column is wide enough to hold the full range. Only ever advanced
    /// through a compare-and-set update; a non-increasing value from an
    /// authenticator is treated as evidence of a cloned credential.
    pub counter: i64,

    /// Human-readable device label ("work laptop", "phone").
    pub label: String,

    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Credential {
    // ---
    pub fn new(
        id: Vec<u8>,
        user_id: Uuid,
        public_key: Vec<u8>,
        counter: i64,
        label: String,
    ) -> Self {
        // ---
        Self {
            id,
            user_id,
            public_key,
            counter,
            label,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

/// A single-use, time-limited password reset token. At most one active
/// token exists per user; issuing a new one replaces the old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
    // ---
    pub user_id: Uuid,

    /// High-entropy opaque value delivered to the user out of band.
    pub token: String,

    pub expires_at: DateTime<Utc>,
}

impl PasswordResetToken {
    // ---
    pub fn new(user_id: Uuid, token: String, ttl: std::time::Duration) -> Self {
        // ---
        Self {
            user_id,
            token,
            expires_at: Utc::now() + Duration::from_std(ttl).unwrap_or(Duration::hours(1)),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        // ---
        now >= self.expires_at
    }
}
