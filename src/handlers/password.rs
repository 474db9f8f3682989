//! Password authentication handlers.
//!
//! 1. `password_register` - Create an account with a password credential
//! 2. `password_login` - Verify a password and bind the session
//! 3. `password_attach` - Add a password to the authenticated account
//!
//! Login failures are indistinguishable from one another: unknown email,
//! passkey-only account, and wrong password all produce the same response.

use crate::app_state::AppState;
use crate::domain::{AuthError, AuthResult, User};
use crate::password;
use crate::session;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PasswordRegisterRequest {
    // ---
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordLoginRequest {
    // ---
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordAttachRequest {
    // ---
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordAuthResponse {
    // ---
    pub success: bool,
    /// Bearer token for the now-authenticated session.
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordAttachResponse {
    // ---
    pub success: bool,
}

// ============================================================================
// Password Registration Handler
// ============================================================================

/// POST /password/register
///
/// Creates a new account whose first credential is a password. The email
/// is required here because it is the login identifier and the delivery
/// address for reset links.
#[tracing::instrument(skip(state, headers, req))]
pub async fn password_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordRegisterRequest>,
) -> AuthResult<Json<PasswordAuthResponse>> {
    // ---
    if req.username.is_empty() {
        return Err(AuthError::InvalidRequest("Username cannot be empty"));
    }
    if req.email.is_empty() {
        return Err(AuthError::InvalidRequest("Email cannot be empty"));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::new(req.username, Some(req.email), Some(password_hash));

    // Uniqueness is enforced by the store; a duplicate surfaces as 409.
    state.repository().create_user(&user).await?;

    let mut conn = state.get_conn().await?;
    let session = session::get_or_start(&headers, &mut conn, state.session_ttl()).await?;
    session::bind_identity(
        &mut conn,
        &session.token,
        user.id,
        user.username.clone(),
        state.session_ttl(),
    )
    .await?;

    state.metrics().record_registration();
    tracing::info!("password account created for user: {}", user.username);

    Ok(Json(PasswordAuthResponse {
        success: true,
        session_token: session.token,
    }))
}

// ============================================================================
// Password Login Handler
// ============================================================================

/// POST /password/login
///
/// Verifies an email/password pair and binds the session on success.
/// Every rejection path returns the identical response.
#[tracing::instrument(skip(state, headers, req))]
pub async fn password_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordLoginRequest>,
) -> AuthResult<Json<PasswordAuthResponse>> {
    // ---
    let user = state
        .repository()
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| {
            tracing::warn!("password login for unknown email");
            state.metrics().record_auth_failure();
            AuthError::InvalidCredentials
        })?;

    // Passkey-only accounts have no hash to check.
    let stored_hash = user.password_hash.as_deref().ok_or_else(|| {
        tracing::warn!("password login against a passkey-only account");
        state.metrics().record_auth_failure();
        AuthError::InvalidCredentials
    })?;

    if !password::verify_password(&req.password, stored_hash) {
        tracing::warn!("password mismatch for user: {}", user.username);
        state.metrics().record_auth_failure();
        return Err(AuthError::InvalidCredentials);
    }

    let mut conn = state.get_conn().await?;
    let session = session::get_or_start(&headers, &mut conn, state.session_ttl()).await?;
    session::bind_identity(
        &mut conn,
        &session.token,
        user.id,
        user.username.clone(),
        state.session_ttl(),
    )
    .await?;

    state.metrics().record_login();
    tracing::info!("user '{}' authenticated with password", user.username);

    Ok(Json(PasswordAuthResponse {
        success: true,
        session_token: session.token,
    }))
}

// ============================================================================
// Password Attach Handler
// ============================================================================

/// POST /password/attach
///
/// Adds (or replaces) a password on the authenticated account, e.g. for a
/// member who registered passkey-first. The target user is the session's
/// identity; the request names no account.
#[tracing::instrument(skip(state, headers, req))]
pub async fn password_attach(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordAttachRequest>,
) -> AuthResult<Json<PasswordAttachResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let session = session::extract_session(&headers, &mut conn).await?;
    let user_id = session.require_user()?;

    let password_hash = password::hash_password(&req.password)?;
    state
        .repository()
        .set_password_hash(user_id, &password_hash)
        .await?;

    tracing::info!("password attached to account");

    Ok(Json(PasswordAttachResponse { success: true }))
}
