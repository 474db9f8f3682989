//! WebAuthn protocol handler factory.
//!
//! Builds the `Webauthn` instance that verifies every ceremony against the
//! configured relying-party identity. The RP ID and allowed origin are
//! configuration inputs; a response signed for any other origin or RP is
//! rejected by the verifier.

use std::str::FromStr;

use crate::config::WebAuthnConfig;
use anyhow::Result;
use reqwest::Url;
use webauthn_rs::{Webauthn, WebauthnBuilder};

/// Creates a configured WebAuthn instance from application config.
///
/// # Errors
/// Fails if the origin is not a valid URL or the builder rejects the
/// RP ID / origin pairing. Both are deployment errors surfaced at startup.
pub fn create_webauthn(config: &WebAuthnConfig) -> Result<Webauthn> {
    // ---
    tracing::debug!("creating webauthn handler for rp_id={}", config.rp_id);

    let origin = Url::from_str(config.origin.as_str())?;
    let webauthn = WebauthnBuilder::new(&config.rp_id, &origin)?
        .rp_name(&config.rp_name)
        .build()?;

    Ok(webauthn)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn config(origin: &str) -> WebAuthnConfig {
        // ---
        WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Clubpass Test".to_string(),
            origin: origin.to_string(),
        }
    }

    #[test]
    fn valid_origin_builds() {
        // ---
        assert!(create_webauthn(&config("http://localhost:8080")).is_ok());
    }

    #[test]
    fn malformed_origin_rejected() {
        // ---
        assert!(create_webauthn(&config("not-a-valid-url")).is_err());
    }
}
