//! Passkey authentication handlers.
//!
//! Implements the two-phase authentication ceremony:
//! 1. `auth_start` - Generate challenge against the user's registered passkeys
//! 2. `auth_finish` - Verify the assertion, advance the signature counter,
//!    and bind the identity to the session
//!
//! The counter update is a compare-and-set keyed on the previously stored
//! value and happens strictly before the session is bound, so two
//! concurrent replays of the same signed response cannot both succeed.
//!
//! All rejection paths surface the same response shape; which branch
//! failed is visible only in the logs.

use crate::app_state::AppState;
use crate::challenge::{self, PendingCeremony};
use crate::domain::{AuthError, AuthResult};
use crate::session;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use webauthn_rs::prelude::*;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthStartRequest {
    // ---
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStartResponse {
    // ---
    /// Bearer token for the session holding the challenge. The finish
    /// request must present it.
    pub session_token: String,
    pub options: RequestChallengeResponse,
}

#[derive(Debug, Deserialize)]
pub struct AuthFinishRequest {
    // ---
    pub credential: PublicKeyCredential,
}

#[derive(Debug, Serialize)]
pub struct AuthFinishResponse {
    // ---
    pub success: bool,
}

// ============================================================================
// Authentication Start Handler
// ============================================================================

/// POST /passkey/auth/start
///
/// Begins an authentication ceremony for the named user. An unknown user
/// and a user with no registered passkeys produce the identical rejection,
/// so the endpoint cannot be used to enumerate accounts.
#[tracing::instrument(skip(state, headers, req))]
pub async fn auth_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AuthStartRequest>,
) -> AuthResult<Json<AuthStartResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session = session::get_or_start(&headers, &mut conn, state.session_ttl()).await?;

    let user = state
        .repository()
        .get_user_by_username(&req.username)
        .await?
        .ok_or_else(|| {
            tracing::warn!("authentication attempt for unknown user");
            state.metrics().record_auth_failure();
            AuthError::InvalidCredentials
        })?;

    let credentials = state.repository().get_credentials_by_user(user.id).await?;

    let passkeys: Vec<Passkey> = credentials
        .iter()
        .filter_map(|cred| {
            serde_json::from_slice(&cred.public_key)
                .map_err(|err| {
                    tracing::error!(
                        "failed to deserialize passkey for credential {}: {:?}",
                        hex::encode(&cred.id),
                        err
                    );
                })
                .ok()
        })
        .collect();

    if passkeys.is_empty() {
        tracing::warn!("user has no usable passkeys");
        state.metrics().record_auth_failure();
        return Err(AuthError::InvalidCredentials);
    }

    let (options, auth_state) = state.webauthn().start_passkey_authentication(&passkeys)?;

    challenge::store_challenge(
        &mut conn,
        &session.token,
        &PendingCeremony::Authentication { state: auth_state },
        state.challenge_ttl(),
    )
    .await?;

    tracing::info!("authentication ceremony started");

    Ok(Json(AuthStartResponse {
        session_token: session.token,
        options,
    }))
}

// ============================================================================
// Authentication Finish Handler
// ============================================================================

/// POST /passkey/auth/finish
///
/// Completes the ceremony:
/// 1. Consume the session's challenge (atomic GETDEL)
/// 2. Verify the assertion signature against the challenge state
/// 3. Enforce the counter invariant with a conditional update
/// 4. Bind the credential's owner to the session
#[tracing::instrument(skip(state, headers, req))]
pub async fn auth_finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AuthFinishRequest>,
) -> AuthResult<Json<AuthFinishResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session_token = session::bearer_token(&headers)?.to_string();

    let ceremony = challenge::consume_challenge(&mut conn, &session_token).await?;
    let auth_state = ceremony.into_authentication()?;

    let auth_result = state
        .webauthn()
        .finish_passkey_authentication(&req.credential, &auth_state)
        .map_err(|err| {
            state.metrics().record_auth_failure();
            AuthError::VerificationFailed(err)
        })?;

    let credential_id = auth_result.cred_id().to_vec();
    let stored = state
        .repository()
        .get_credential_by_id(&credential_id)
        .await?
        .ok_or_else(|| {
            tracing::error!(
                "assertion for credential not in store: {}",
                hex::encode(&credential_id)
            );
            state.metrics().record_auth_failure();
            AuthError::UnknownCredential
        })?;

    enforce_counter(&state, &credential_id, stored.counter, auth_result.counter()).await?;

    let user = state
        .repository()
        .get_user_by_id(stored.user_id)
        .await?
        .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("credential owner missing from store")))?;

    session::bind_identity(
        &mut conn,
        &session_token,
        user.id,
        user.username.clone(),
        state.session_ttl(),
    )
    .await?;

    state.metrics().record_login();
    tracing::info!("user '{}' authenticated with passkey", user.username);

    Ok(Json(AuthFinishResponse { success: true }))
}

/// Outcome of the signature-counter policy for one verified assertion.
#[derive(Debug, PartialEq, Eq)]
enum CounterAction {
    /// Counter-less authenticator (both sides zero): refresh
    /// `last_used_at` only.
    Touch,
    /// Strictly increasing: advance to the asserted value.
    Advance(i64),
    /// Non-increasing: evidence of a cloned credential.
    Reject,
}

/// Decides what a verified assertion's counter means against the stored
/// one. The asserted counter must strictly exceed the stored value, with
/// one exception: authenticators that never implement counters always
/// report zero, and `0 -> 0` is accepted as touch-only.
fn counter_action(stored_counter: i64, asserted_counter: u32) -> CounterAction {
    // ---
    if asserted_counter == 0 && stored_counter == 0 {
        return CounterAction::Touch;
    }

    let asserted = i64::from(asserted_counter);
    if asserted <= stored_counter {
        return CounterAction::Reject;
    }

    CounterAction::Advance(asserted)
}

/// Applies [`counter_action`] against the store.
///
/// The advance is conditional on the previously stored value, so a
/// concurrent duplicate of the same signed response loses the race and is
/// rejected even though its counter looked fresh when we read it.
async fn enforce_counter(
    state: &AppState,
    credential_id: &[u8],
    stored_counter: i64,
    asserted_counter: u32,
) -> AuthResult<()> {
    // ---
    match counter_action(stored_counter, asserted_counter) {
        CounterAction::Touch => {
            state.repository().touch_credential(credential_id).await?;
            Ok(())
        }

        CounterAction::Reject => {
            tracing::error!(
                "counter regression: stored={}, asserted={}; possible cloned credential",
                stored_counter,
                asserted_counter
            );
            state.metrics().record_auth_failure();
            Err(AuthError::CounterRegression)
        }

        CounterAction::Advance(asserted) => {
            let advanced = state
                .repository()
                .advance_credential_counter(credential_id, stored_counter, asserted)
                .await?;

            if !advanced {
                tracing::error!(
                    "counter compare-and-set lost: stored={}, asserted={}; concurrent replay",
                    stored_counter,
                    asserted
                );
                state.metrics().record_auth_failure();
                return Err(AuthError::CounterRegression);
            }

            Ok(())
        }
    }
}
