//! Ceremony challenge management.
//!
//! A ceremony spans two round trips, and consecutive requests may land on
//! different server processes, so the challenge state must live in durable
//! external storage rather than process memory. Challenges are keyed by the
//! caller's session token: one in-flight challenge per session, overwritten
//! whenever a new ceremony begins.
//!
//! Consumption is a single atomic GETDEL. The challenge is gone after the
//! first read even if the subsequent verification fails, so a failed
//! ceremony can never be retried against the same challenge.

use crate::domain::{AuthError, AuthResult};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;
use webauthn_rs::prelude::{PasskeyAuthentication, PasskeyRegistration};

// ---

/// Identity a registration ceremony will create or attach to once it
/// completes. For new accounts nothing is persisted until verification
/// succeeds; the pending identity travels inside the challenge record.
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingIdentity {
    // ---
    pub user_id: Uuid,
    pub username: String,
    pub email: Option<String>,

    /// Device label for the credential being registered.
    pub label: String,

    /// True when attaching a passkey to an already-authenticated account;
    /// the user row then exists and must not be created again.
    pub existing_account: bool,
}

/// The session's in-flight ceremony, tagged by purpose. A finish request
/// whose purpose does not match the stored variant fails closed, and the
/// challenge is consumed either way.
#[derive(Debug, Serialize, Deserialize)]
pub enum PendingCeremony {
    // ---
    Registration {
        identity: PendingIdentity,
        state: PasskeyRegistration,
    },
    Authentication {
        state: PasskeyAuthentication,
    },
}

impl PendingCeremony {
    /// Unwraps a registration ceremony; any other purpose fails closed.
    pub fn into_registration(self) -> AuthResult<(PendingIdentity, PasskeyRegistration)> {
        // ---
        match self {
            PendingCeremony::Registration { identity, state } => Ok((identity, state)),
            _ => {
                tracing::warn!("registration finish against a non-registration challenge");
                Err(AuthError::ChallengeMissingOrExpired)
            }
        }
    }

    /// Unwraps an authentication ceremony; any other purpose fails closed.
    pub fn into_authentication(self) -> AuthResult<PasskeyAuthentication> {
        // ---
        match self {
            PendingCeremony::Authentication { state } => Ok(state),
            _ => {
                tracing::warn!("authentication finish against a non-authentication challenge");
                Err(AuthError::ChallengeMissingOrExpired)
            }
        }
    }
}

// ---

fn challenge_key(session_token: &str) -> String {
    // ---
    format!("challenge:{session_token}")
}

/// Stores a ceremony challenge against the session, overwriting any prior
/// pending challenge, with a bounded time-to-live.
pub async fn store_challenge(
    redis_conn: &mut MultiplexedConnection,
    session_token: &str,
    ceremony: &PendingCeremony,
    ttl: Duration,
) -> AuthResult<()> {
    // ---
    let bytes = serde_json::to_vec(ceremony)?;

    redis_conn
        .set_ex::<_, _, ()>(challenge_key(session_token), bytes, ttl.as_secs())
        .await?;

    Ok(())
}

/// Atomically reads and clears the session's pending challenge.
///
/// Absence means the challenge was never issued, expired, or was already
/// consumed; all three are the same failure to the caller.
pub async fn consume_challenge(
    redis_conn: &mut MultiplexedConnection,
    session_token: &str,
) -> AuthResult<PendingCeremony> {
    // ---
    let bytes: Option<Vec<u8>> = redis_conn.get_del(challenge_key(session_token)).await?;

    let Some(bytes) = bytes else {
        return Err(AuthError::ChallengeMissingOrExpired);
    };

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn challenge_keys_are_session_scoped() {
        // ---
        assert_eq!(challenge_key("abc"), "challenge:abc");
        assert_ne!(challenge_key("abc"), challenge_key("def"));
    }
}
