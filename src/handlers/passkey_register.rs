//! Passkey registration handlers.
//!
//! Implements the two-phase registration ceremony:
//! 1. `register_start` - Generate challenge and return credential creation options
//! 2. `register_finish` - Verify the attestation response and persist the credential
//!
//! No durable record is written until the finish step verifies: for a new
//! account, the pending identity travels inside the challenge record and
//! the user row is created together with the credential in one
//! transaction. A failed or abandoned ceremony leaves nothing behind.
//!
//! On an authenticated session the same endpoints attach an additional
//! passkey to the session's own account. The target user is derived from
//! the session, never from the request body.

use crate::app_state::AppState;
use crate::challenge::{self, PendingCeremony, PendingIdentity};
use crate::domain::{AuthError, AuthResult, Credential, User};
use crate::session;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use webauthn_rs::prelude::*;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterStartRequest {
    // ---
    pub username: String,
    pub email: Option<String>,

    /// Device label for the credential ("work laptop"). Optional.
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterStartResponse {
    // ---
    /// Bearer token for the session holding the challenge. The finish
    /// request must present it.
    pub session_token: String,
    pub challenge: CreationChallengeResponse,
}

#[derive(Debug, Deserialize)]
pub struct RegisterFinishRequest {
    // ---
    pub credential: RegisterPublicKeyCredential,
}

#[derive(Debug, Serialize)]
pub struct RegisterFinishResponse {
    // ---
    pub success: bool,
    pub credential_id: String,
}

// ============================================================================
// Registration Start Handler
// ============================================================================

/// POST /passkey/register/start
///
/// Begins a registration ceremony. Anonymous callers name a new identity;
/// authenticated callers attach a passkey to their own account and the
/// request's identity fields are ignored.
///
/// The challenge is stored against the caller's session with a TTL,
/// replacing any prior pending challenge for that session.
#[tracing::instrument(skip(state, headers, req))]
pub async fn register_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterStartRequest>,
) -> AuthResult<Json<RegisterStartResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session = session::get_or_start(&headers, &mut conn, state.session_ttl()).await?;

    let label = req.label.unwrap_or_else(|| "passkey".to_string());

    let identity = match session.user_id {
        // Attach flow: the target account is the session's own.
        Some(user_id) => {
            let user = state
                .repository()
                .get_user_by_id(user_id)
                .await?
                .ok_or(AuthError::Unauthorized("session user no longer exists"))?;

            PendingIdentity {
                user_id: user.id,
                username: user.username,
                email: user.email,
                label,
                existing_account: true,
            }
        }

        // New account: nothing is persisted until the ceremony verifies.
        None => {
            if req.username.is_empty() {
                return Err(AuthError::InvalidRequest("Username cannot be empty"));
            }

            // Early duplicate check for a friendly error; the store's
            // uniqueness constraint is the real enforcement at finish.
            if state
                .repository()
                .get_user_by_username(&req.username)
                .await?
                .is_some()
            {
                return Err(AuthError::DuplicateIdentity);
            }

            PendingIdentity {
                user_id: Uuid::new_v4(),
                username: req.username,
                email: req.email,
                label,
                existing_account: false,
            }
        }
    };

    // Exclude already-registered credentials so an authenticator refuses to
    // re-enroll itself on the attach flow.
    let exclude = if identity.existing_account {
        let creds = state
            .repository()
            .get_credentials_by_user(identity.user_id)
            .await?;
        Some(
            creds
                .iter()
                .map(|c| CredentialID::from(c.id.clone()))
                .collect(),
        )
    } else {
        None
    };

    let (challenge_response, registration_state) = state.webauthn().start_passkey_registration(
        identity.user_id,
        &identity.username,
        &identity.username,
        exclude,
    )?;

    challenge::store_challenge(
        &mut conn,
        &session.token,
        &PendingCeremony::Registration {
            identity,
            state: registration_state,
        },
        state.challenge_ttl(),
    )
    .await?;

    tracing::info!("registration ceremony started");

    Ok(Json(RegisterStartResponse {
        session_token: session.token,
        challenge: challenge_response,
    }))
}

// ============================================================================
// Registration Finish Handler
// ============================================================================

/// POST /passkey/register/finish
///
/// Completes the ceremony: consumes the session's pending challenge,
/// verifies the attestation response, and only then persists the user
/// (for new accounts) and credential. On success the session is bound to
/// the resulting identity.
#[tracing::instrument(skip(state, headers, req))]
pub async fn register_finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterFinishRequest>,
) -> AuthResult<Json<RegisterFinishResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session_token = session::bearer_token(&headers)?.to_string();

    // Atomic read-and-clear; a failed verification below cannot retry
    // against this challenge.
    let ceremony = challenge::consume_challenge(&mut conn, &session_token).await?;
    let (identity, registration_state) = ceremony.into_registration()?;

    let passkey = state
        .webauthn()
        .finish_passkey_registration(&req.credential, &registration_state)
        .map_err(|err| {
            state.metrics().record_auth_failure();
            AuthError::VerificationFailed(err)
        })?;

    let cred_id = passkey.cred_id().to_vec();
    let passkey_bytes = serde_json::to_vec(&passkey)?;

    // webauthn-rs tracks the authenticator-reported counter inside the
    // serialized passkey; our own column starts at zero and advances on
    // each verified assertion.
    let credential = Credential::new(
        cred_id.clone(),
        identity.user_id,
        passkey_bytes,
        0,
        identity.label.clone(),
    );

    if identity.existing_account {
        state.repository().save_credential(&credential).await?;
    } else {
        let user = User {
            id: identity.user_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            password_hash: None,
            created_at: chrono::Utc::now(),
        };
        state
            .repository()
            .create_user_with_credential(&user, &credential)
            .await?;
    }

    session::bind_identity(
        &mut conn,
        &session_token,
        identity.user_id,
        identity.username.clone(),
        state.session_ttl(),
    )
    .await?;

    state.metrics().record_registration();

    let cred_id_hex = hex::encode(&cred_id);
    tracing::info!(
        "registration completed for user: {} (credential: {})",
        identity.username,
        cred_id_hex
    );

    Ok(Json(RegisterFinishResponse {
        success: true,
        credential_id: cred_id_hex,
    }))
}
