//! Password reset handlers.
//!
//! 1. `reset_request` - Issue a single-use reset token and mail the link
//! 2. `reset_confirm` - Consume the token and set the new password
//!
//! The request endpoint answers identically whether or not the email maps
//! to an account, and issuing a new token invalidates any earlier one for
//! the same user. A token can be consumed exactly once, even under
//! concurrent confirm attempts.

use crate::app_state::AppState;
use crate::domain::{AuthError, AuthResult, PasswordResetToken};
use crate::password;
use axum::{extract::State, http::StatusCode, Json};
use rand::RngCore;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    // ---
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequestResponse {
    // ---
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirmRequest {
    // ---
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetConfirmResponse {
    // ---
    pub success: bool,
}

// ---

/// 256 bits of OS entropy, hex-encoded. Long enough that the token is the
/// only secret in the reset link.
fn generate_reset_token() -> String {
    // ---
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ============================================================================
// Reset Request Handler
// ============================================================================

/// POST /password/reset/request
///
/// Issues a reset token for the account behind `email` and mails the link.
/// The response is the same 202 whether the account exists, the account is
/// passkey-only, or the mail bounces; only the logs know.
#[tracing::instrument(skip(state, req))]
pub async fn reset_request(
    State(state): State<AppState>,
    Json(req): Json<ResetRequestRequest>,
) -> AuthResult<(StatusCode, Json<ResetRequestResponse>)> {
    // ---
    let accepted = (
        StatusCode::ACCEPTED,
        Json(ResetRequestResponse {
            message: "If that email is registered, a reset link has been sent".to_string(),
        }),
    );

    let Some(user) = state.repository().get_user_by_email(&req.email).await? else {
        tracing::info!("reset requested for unknown email");
        return Ok(accepted);
    };

    let token = PasswordResetToken::new(user.id, generate_reset_token(), state.reset_token_ttl());

    // One active token per user: this replaces any earlier unconsumed one.
    state.repository().upsert_reset_token(&token).await?;

    let link = format!("{}?token={}", state.reset_link_base(), token.token);
    let body = format!(
        "<p>A password reset was requested for your account.</p>\
         <p><a href=\"{link}\">Reset your password</a></p>\
         <p>The link expires in {} minutes. If you did not request this, \
         you can ignore this message.</p>",
        state.reset_token_ttl().as_secs() / 60
    );

    let email = user.email.as_deref().unwrap_or(&req.email);
    if !state.mailer().send(email, "Reset your password", &body).await {
        // Delivery problems must not leak through the response.
        tracing::error!("failed to send reset email for user: {}", user.username);
    } else {
        tracing::info!("reset link sent for user: {}", user.username);
    }

    Ok(accepted)
}

// ============================================================================
// Reset Confirm Handler
// ============================================================================

/// POST /password/reset/confirm
///
/// Redeems a reset token and replaces the account's password. The token is
/// removed from the store atomically with the lookup, so a concurrent
/// duplicate of this request finds nothing. Expired tokens are discarded
/// on touch.
#[tracing::instrument(skip(state, req))]
pub async fn reset_confirm(
    State(state): State<AppState>,
    Json(req): Json<ResetConfirmRequest>,
) -> AuthResult<Json<ResetConfirmResponse>> {
    // ---
    // Policy is checked before the token is spent: a too-short password
    // should not burn the caller's only reset link.
    password::validate_password(&req.new_password)?;

    let token = state
        .repository()
        .consume_reset_token(&req.token)
        .await?
        .ok_or_else(|| {
            tracing::warn!("reset confirm with unknown or already-used token");
            AuthError::ResetTokenInvalid
        })?;

    if token.is_expired(chrono::Utc::now()) {
        // Already deleted by the consume above; nothing lingers.
        tracing::warn!("reset confirm with expired token");
        return Err(AuthError::ResetTokenExpired);
    }

    let password_hash = password::hash_password(&req.new_password)?;
    state
        .repository()
        .set_password_hash(token.user_id, &password_hash)
        .await?;

    tracing::info!("password reset completed");

    Ok(Json(ResetConfirmResponse { success: true }))
}
