mod error;
mod mailer;
mod metrics;
mod models;
mod repository;

// Publicly expose the error taxonomy
pub use error::{AuthError, AuthResult, ErrorResponse};

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Publicly expose the Mailer abstraction
pub use mailer::{Mailer, MailerPtr};

// Publicly expose persistence abstractions
pub use models::{Credential, PasswordResetToken, User};
pub use repository::{Repository, RepositoryPtr};

// Re-export the database bootstrap helper at the domain level, matching how
// tests consume it.
pub use crate::infrastructure::init_database_with_retry_from_env;
