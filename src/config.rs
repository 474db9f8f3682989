// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
///
/// Missing configuration is treated as a deployment error,
/// not a recoverable runtime condition.
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
///
/// This macro is intended for config unit tests only and enforces
/// consistent error messages across failure cases.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: database::DatabaseConfig,
    pub redis: redis::RedisConfig,
    pub webauthn: webauthn::WebAuthnConfig,
    pub auth: auth::AuthConfig,
    pub smtp: smtp::SmtpConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            database: database::DatabaseConfig::from_env()?,
            redis: redis::RedisConfig::from_env()?,
            webauthn: webauthn::WebAuthnConfig::from_env()?,
            auth: auth::AuthConfig::from_env()?,
            smtp: smtp::SmtpConfig::from_env()?,
        })
    }
}

// ============================================================
// Database configuration
// ============================================================

mod database {
    // ---
    use super::*;

    /// Database-related configuration derived from environment variables.
    ///
    /// This configuration is required for the service to function and
    /// is validated eagerly during startup.
    #[derive(Debug, Clone)]
    pub struct DatabaseConfig {
        /// PostgreSQL connection string.
        pub database_url: String,

        /// Number of retry attempts when initializing the database connection. Defaults to 50.
        pub retry_count: u32,

        /// Maximum time to wait when acquiring a connection from the pool. Defaults to 30 seconds.
        pub acquire_timeout: Duration,

        /// Minimum number of connections to keep in the pool, even when idle. Defaults to 2.
        pub min_connections: u32,

        /// Maximum number of connections to be open concurrently. Defaults to 15.
        pub max_connections: u32,
    }

    impl DatabaseConfig {
        /// Builds a [`DatabaseConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// Startup will fail fast rather than continuing with incomplete
        /// or invalid configuration.
        pub fn from_env() -> Result<Self> {
            // ---
            let database_url = required_env!("DATABASE_URL");
            let retry_count = optional_env_parse!("CLUBPASS_DB_RETRY_COUNT", u32, 50);
            let acquire_timeout_secs =
                optional_env_parse!("CLUBPASS_DB_ACQUIRE_TIMEOUT_SEC", u64, 30);
            let min_connections = optional_env_parse!("CLUBPASS_DB_MIN_CONNECTIONS", u32, 2);
            let max_connections = optional_env_parse!("CLUBPASS_DB_MAX_CONNECTIONS", u32, 15);

            Ok(Self {
                database_url,
                retry_count,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
                min_connections,
                max_connections,
            })
        }
    }
}
pub use database::DatabaseConfig;

// ============================================================
// Redis configuration
// ============================================================

mod redis {
    // ---
    use super::*;

    /// Redis-related configuration used for ephemeral and cache-backed state.
    ///
    /// Redis holds session records and in-flight ceremony challenges, both
    /// with a bounded time-to-live.
    #[derive(Debug, Clone)]
    pub struct RedisConfig {
        /// Redis connection string.
        pub url: String,
    }

    impl RedisConfig {
        /// Builds a [`RedisConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        pub fn from_env() -> Result<Self> {
            // ---
            let url = required_env!("CLUBPASS_REDIS_URL");

            Ok(Self { url })
        }
    }
}
pub use redis::RedisConfig;

// ============================================================
// WebAuthn configuration
// ============================================================

mod webauthn {
    // ---
    use super::*;

    /// WebAuthn / Passkeys configuration.
    ///
    /// These values define the relying party identity and security
    /// origin used during WebAuthn registration and authentication.
    #[derive(Debug, Clone)]
    pub struct WebAuthnConfig {
        /// Relying Party ID (typically a domain name).
        pub rp_id: String,

        /// Human-readable Relying Party name.
        pub rp_name: String,

        /// Fully-qualified origin (e.g. https://example.com).
        pub origin: String,
    }

    impl WebAuthnConfig {
        /// Builds a [`WebAuthnConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// WebAuthn configuration is considered security-critical
        /// and must be explicitly provided.
        pub fn from_env() -> Result<Self> {
            // ---
            let rp_id = required_env!("CLUBPASS_WEBAUTHN_RP_ID");
            let origin = required_env!("CLUBPASS_WEBAUTHN_ORIGIN");

            let rp_name =
                std::env::var("CLUBPASS_WEBAUTHN_RP_NAME").unwrap_or_else(|_| "Clubpass".to_string());

            Ok(Self {
                rp_id,
                rp_name,
                origin,
            })
        }
    }
}
pub use webauthn::WebAuthnConfig;

// ============================================================
// Auth lifetimes configuration
// ============================================================

mod auth {
    // ---
    use super::*;

    /// Lifetimes for the ephemeral authentication state.
    #[derive(Debug, Clone)]
    pub struct AuthConfig {
        /// Time-to-live for in-flight ceremony challenges. Defaults to 5 minutes.
        pub challenge_ttl: Duration,

        /// Time-to-live for session tokens. Defaults to 7 days.
        pub session_ttl: Duration,

        /// Time-to-live for password reset tokens. Defaults to 1 hour.
        pub reset_token_ttl: Duration,

        /// Base URL embedded in password reset links
        /// (e.g. https://club.example.com/reset).
        pub reset_link_base: String,
    }

    impl AuthConfig {
        /// Builds an [`AuthConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        pub fn from_env() -> Result<Self> {
            // ---
            let challenge_ttl_secs = optional_env_parse!("CLUBPASS_CHALLENGE_TTL_SEC", u64, 300);
            let session_ttl_secs = optional_env_parse!("CLUBPASS_SESSION_TTL_SEC", u64, 604_800);
            let reset_ttl_secs = optional_env_parse!("CLUBPASS_RESET_TOKEN_TTL_SEC", u64, 3_600);
            let reset_link_base = required_env!("CLUBPASS_RESET_LINK_BASE");

            Ok(Self {
                challenge_ttl: Duration::from_secs(challenge_ttl_secs),
                session_ttl: Duration::from_secs(session_ttl_secs),
                reset_token_ttl: Duration::from_secs(reset_ttl_secs),
                reset_link_base,
            })
        }
    }
}
pub use auth::AuthConfig;

// ============================================================
// SMTP configuration
// ============================================================

mod smtp {
    // ---
    use super::*;

    /// Outbound email configuration. Only used for password reset links.
    ///
    /// When no relay is configured the service falls back to the stub
    /// mailer, which accepts every message and logs it. That keeps local
    /// development and tests free of SMTP infrastructure.
    #[derive(Debug, Clone)]
    pub struct SmtpConfig {
        /// SMTP relay hostname. `None` selects the stub mailer.
        pub relay: Option<String>,

        /// Sender address for outbound mail.
        pub sender: String,
    }

    impl SmtpConfig {
        /// Builds an [`SmtpConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let relay = std::env::var("CLUBPASS_SMTP_RELAY").ok();
            let sender = std::env::var("CLUBPASS_SMTP_SENDER")
                .unwrap_or_else(|_| "no-reply@clubpass.local".to_string());

            Ok(Self { relay, sender })
        }
    }
}
pub use smtp::SmtpConfig;

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use anyhow::Result;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_database_url_fails() -> Result<()> {
        // ---
        std::env::remove_var("DATABASE_URL");

        assert_missing_config!(database::DatabaseConfig::from_env(), "DATABASE_URL");

        Ok(())
    }

    #[test]
    #[serial]
    fn database_defaults_applied() -> Result<()> {
        // ---
        let db_url = "postgres://test";
        std::env::set_var("DATABASE_URL", db_url); // required

        std::env::remove_var("CLUBPASS_DB_RETRY_COUNT");
        std::env::remove_var("CLUBPASS_DB_ACQUIRE_TIMEOUT_SEC");
        std::env::remove_var("CLUBPASS_DB_MIN_CONNECTIONS");
        std::env::remove_var("CLUBPASS_DB_MAX_CONNECTIONS");

        let cfg = database::DatabaseConfig::from_env()?;
        assert_eq!(cfg.database_url, db_url);
        assert_eq!(cfg.retry_count, 50);
        assert_eq!(cfg.acquire_timeout.as_secs(), 30);
        assert_eq!(cfg.min_connections, 2);
        assert_eq!(cfg.max_connections, 15);

        Ok(())
    }

    #[test]
    #[serial]
    fn auth_lifetime_defaults_applied() -> Result<()> {
        // ---
        std::env::remove_var("CLUBPASS_CHALLENGE_TTL_SEC");
        std::env::remove_var("CLUBPASS_SESSION_TTL_SEC");
        std::env::remove_var("CLUBPASS_RESET_TOKEN_TTL_SEC");
        std::env::set_var("CLUBPASS_RESET_LINK_BASE", "http://localhost:8080/reset");

        let cfg = auth::AuthConfig::from_env()?;
        assert_eq!(cfg.challenge_ttl.as_secs(), 300);
        assert_eq!(cfg.session_ttl.as_secs(), 604_800);
        assert_eq!(cfg.reset_token_ttl.as_secs(), 3_600);

        Ok(())
    }

    #[test]
    #[serial]
    fn missing_reset_link_base_fails() -> Result<()> {
        // ---
        std::env::remove_var("CLUBPASS_RESET_LINK_BASE");

        assert_missing_config!(auth::AuthConfig::from_env(), "CLUBPASS_RESET_LINK_BASE");

        Ok(())
    }

    #[test]
    #[serial]
    fn smtp_defaults_to_stub() -> Result<()> {
        // ---
        std::env::remove_var("CLUBPASS_SMTP_RELAY");
        std::env::remove_var("CLUBPASS_SMTP_SENDER");

        let cfg = smtp::SmtpConfig::from_env()?;
        assert!(cfg.relay.is_none());
        assert_eq!(cfg.sender, "no-reply@clubpass.local");

        Ok(())
    }

    #[test]
    #[serial]
    fn app_config_from_env_success() -> Result<()> {
        // ---
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("CLUBPASS_REDIS_URL", "redis://localhost");
        std::env::set_var("CLUBPASS_WEBAUTHN_RP_ID", "club.example.com");
        std::env::set_var("CLUBPASS_WEBAUTHN_ORIGIN", "https://club.example.com");
        std::env::set_var("CLUBPASS_RESET_LINK_BASE", "https://club.example.com/reset");

        let cfg = AppConfig::from_env()?;
        assert_eq!(cfg.webauthn.rp_name, "Clubpass");

        Ok(())
    }
}
