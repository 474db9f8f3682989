//! Passkey credential management handlers.
//!
//! 1. `list_credentials` - List all passkeys for the authenticated user
//! 2. `delete_credential` - Remove a specific passkey
//!
//! Both resolve the target account from the caller's session; the request
//! never names a user.

use crate::app_state::AppState;
use crate::domain::{AuthError, AuthResult};
use crate::session;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use base64::Engine;
use serde::Serialize;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response containing a user's registered credentials.
#[derive(Debug, Serialize)]
pub struct ListCredentialsResponse {
    // ---
    pub credentials: Vec<CredentialInfo>,
}

/// Sanitized view of a credential suitable for display. Key material is
/// never exposed.
#[derive(Debug, Serialize)]
pub struct CredentialInfo {
    // ---
    /// Base64-encoded credential ID
    pub id: String,
    /// Device label supplied at registration
    pub label: String,
    /// When this credential was registered
    pub created_at: String,
    /// When this credential last completed an authentication
    pub last_used_at: Option<String>,
}

/// Response for successful credential deletion.
#[derive(Debug, Serialize)]
pub struct DeleteCredentialResponse {
    // ---
    pub success: bool,
}

// ============================================================================
// List Credentials Handler
// ============================================================================

/// GET /passkey/credentials
///
/// Lists the passkeys registered to the authenticated user, so members can
/// see which devices can sign in to their account.
#[tracing::instrument(skip(state, headers))]
pub async fn list_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AuthResult<Json<ListCredentialsResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session = session::extract_session(&headers, &mut conn).await?;
    let user_id = session.require_user()?;

    let credentials = state.repository().get_credentials_by_user(user_id).await?;

    let credential_list: Vec<CredentialInfo> = credentials
        .into_iter()
        .map(|cred| CredentialInfo {
            id: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&cred.id),
            label: cred.label,
            created_at: cred.created_at.to_rfc3339(),
            last_used_at: cred.last_used_at.map(|t| t.to_rfc3339()),
        })
        .collect();

    tracing::info!("listed {} credentials", credential_list.len());

    Ok(Json(ListCredentialsResponse {
        credentials: credential_list,
    }))
}

// ============================================================================
// Delete Credential Handler
// ============================================================================

/// DELETE /passkey/credentials/{id}
///
/// Deletes one of the authenticated user's passkeys (lost device, old
/// authenticator). Ownership is checked against the session identity
/// before anything is removed.
#[tracing::instrument(skip(state, headers))]
pub async fn delete_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(credential_id_base64): Path<String>,
) -> AuthResult<Json<DeleteCredentialResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session = session::extract_session(&headers, &mut conn).await?;
    let user_id = session.require_user()?;

    let credential_id = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(&credential_id_base64)
        .map_err(|err| {
            tracing::warn!("invalid base64 credential id: {}", err);
            AuthError::InvalidRequest("Invalid credential ID format")
        })?;

    let credential = state
        .repository()
        .get_credential_by_id(&credential_id)
        .await?
        .ok_or(AuthError::UnknownCredential)?;

    if credential.user_id != user_id {
        tracing::warn!(
            "user {} attempted to delete a credential owned by user {}",
            user_id,
            credential.user_id
        );
        // Same shape as "not found": the caller learns nothing about
        // other users' credential ids.
        return Err(AuthError::UnknownCredential);
    }

    state.repository().delete_credential(&credential_id).await?;

    tracing::info!("deleted credential {}", credential_id_base64);

    Ok(Json(DeleteCredentialResponse { success: true }))
}
