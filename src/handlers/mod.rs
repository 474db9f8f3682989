// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod credentials;
mod health;
mod metrics;
mod passkey_authenticate;
mod passkey_register;
mod password;
mod password_reset;
mod root;
mod session;

// Core handlers
pub use health::health_check;
pub use metrics::metrics_handler;
pub use root::root_handler;

// Passkey ceremony handlers
pub use passkey_authenticate::{auth_finish, auth_start};
pub use passkey_register::{register_finish, register_start};

// Passkey credential management handlers
pub use credentials::{delete_credential, list_credentials};

// Password handlers
pub use password::{password_attach, password_login, password_register};
pub use password_reset::{reset_confirm, reset_request};

// Session handlers
pub use session::{session_logout, session_me, session_start};
