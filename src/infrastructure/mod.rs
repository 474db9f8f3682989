mod database;
mod email;
pub mod metrics;
mod webauthn;

// Re-export the factory functions for easy access
pub use database::{create_postgres_repository, init_database_with_retry_from_env};
pub use email::{create_smtp_mailer, create_stub_mailer};
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use webauthn::create_webauthn;
