//! Outbound email backends.
//!
//! Two implementations of the `Mailer` seam: an SMTP relay transport for
//! production and a stub that accepts everything for development and
//! tests. Which one is built depends on whether an SMTP relay is
//! configured.
//!
//! Delivery failure never propagates to callers as an error: the reset
//! flow's user-visible response must not depend on whether a message went
//! out.

use crate::config::SmtpConfig;
use crate::domain::{Mailer, MailerPtr};
use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

// ---

/// Builds a mailer from configuration: SMTP when a relay is configured,
/// the accept-everything stub otherwise.
pub fn create_smtp_mailer(config: &SmtpConfig) -> Result<MailerPtr> {
    // ---
    match &config.relay {
        Some(relay) => {
            tracing::info!("using SMTP relay: {}", relay);
            let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)
                .with_context(|| format!("invalid SMTP relay: {relay}"))?
                .build();

            Ok(Arc::new(SmtpMailer {
                transport,
                sender: config.sender.clone(),
            }))
        }
        None => create_stub_mailer(config),
    }
}

/// Builds the stub mailer regardless of configuration. Used by tests.
pub fn create_stub_mailer(config: &SmtpConfig) -> Result<MailerPtr> {
    // ---
    tracing::info!("no SMTP relay configured; outbound mail goes to the log only");
    Ok(Arc::new(StubMailer {
        sender: config.sender.clone(),
    }))
}

// ---

struct SmtpMailer {
    // ---
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

fn build_message(sender: &str, to: &str, subject: &str, html_body: &str) -> Result<Message> {
    // ---
    Ok(Message::builder()
        .from(sender.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html_body.to_string())?)
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    // ---
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> bool {
        // ---
        let message = match build_message(&self.sender, to, subject, html_body) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!("failed to build outbound message: {:?}", err);
                return false;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("SMTP delivery failed: {:?}", err);
                false
            }
        }
    }
}

// ---

/// Accepts every message and logs the envelope. The body is not logged;
/// reset links are credentials.
struct StubMailer {
    // ---
    sender: String,
}

#[async_trait::async_trait]
impl Mailer for StubMailer {
    // ---
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> bool {
        // ---
        // Still validate the envelope so tests catch malformed addresses.
        if build_message(&self.sender, to, subject, html_body).is_err() {
            tracing::error!("stub mailer rejected malformed message");
            return false;
        }

        tracing::info!("stub mailer: would send '{}' to {}", subject, to);
        true
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::SmtpConfig;

    fn stub() -> MailerPtr {
        // ---
        create_stub_mailer(&SmtpConfig {
            relay: None,
            sender: "no-reply@clubpass.local".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn stub_accepts_well_formed_mail() {
        // ---
        let mailer = stub();
        assert!(
            mailer
                .send("member@example.com", "Reset your password", "<p>link</p>")
                .await
        );
    }

    #[tokio::test]
    async fn stub_rejects_malformed_recipient() {
        // ---
        let mailer = stub();
        assert!(!mailer.send("not an address", "subject", "body").await);
    }

    #[test]
    fn factory_prefers_smtp_when_relay_configured() {
        // ---
        let result = create_smtp_mailer(&SmtpConfig {
            relay: Some("smtp.example.com".to_string()),
            sender: "no-reply@clubpass.local".to_string(),
        });
        assert!(result.is_ok());
    }
}
