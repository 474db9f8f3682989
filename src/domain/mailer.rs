use std::sync::Arc;

/// Abstraction for outbound email. The core only ever sends password reset
/// links; delivery failure is reported, logged by the caller, and never
/// changes the user-visible response.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    // ---
    /// Send a message. Returns `true` on accepted delivery.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> bool;
}

/// Type alias for any backend that implements Mailer.
pub type MailerPtr = Arc<dyn Mailer>;
