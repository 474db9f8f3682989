//! Session endpoint handlers.
//!
//! 1. `session_start` - Mint an anonymous session explicitly
//! 2. `session_me` - Report the caller's session identity
//! 3. `session_logout` - Invalidate the caller's session
//!
//! Most clients never call `session_start`: the ceremony and login start
//! endpoints mint a session implicitly on first contact.

use crate::app_state::AppState;
use crate::domain::AuthResult;
use crate::session;
use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionStartResponse {
    // ---
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionMeResponse {
    // ---
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionLogoutResponse {
    // ---
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
///
/// Mints a fresh anonymous session, ignoring any token the caller already
/// holds.
#[tracing::instrument(skip(state))]
pub async fn session_start(
    State(state): State<AppState>,
) -> AuthResult<Json<SessionStartResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let token = session::start_session(&mut conn, state.session_ttl()).await?;

    Ok(Json(SessionStartResponse {
        session_token: token,
    }))
}

/// GET /session/me
///
/// Reports what the caller's bearer token currently represents. Anonymous
/// sessions are valid here; only missing or expired tokens are rejected.
#[tracing::instrument(skip(state, headers))]
pub async fn session_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionMeResponse>> {
    // ---
    let mut conn = state.get_conn().await?;
    let info = session::extract_session(&headers, &mut conn).await?;

    Ok(Json(SessionMeResponse {
        authenticated: info.user_id.is_some(),
        user_id: info.user_id.map(|id| id.to_string()),
        username: info.username,
    }))
}

/// POST /session/logout
///
/// Deletes the caller's session record. Succeeds even when the token is
/// already gone; logout is idempotent.
#[tracing::instrument(skip(state, headers))]
pub async fn session_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionLogoutResponse>> {
    // ---
    let mut conn = state.get_conn().await?;

    if let Ok(token) = session::bearer_token(&headers) {
        session::end_session(&mut conn, token).await?;
    }

    Ok(Json(SessionLogoutResponse { success: true }))
}
