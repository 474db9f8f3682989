//! Session management.
//!
//! A session is an ephemeral Redis record keyed by an opaque bearer token.
//! It starts anonymous, may hold one in-flight ceremony challenge (see
//! [`crate::challenge`]), and gains a bound identity only after a
//! successful password or passkey verification. Sessions expire via Redis
//! TTL and are invalidated on explicit logout.

use crate::domain::{AuthError, AuthResult};
use axum::http::HeaderMap;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// ---

/// Session data stored in Redis.
#[derive(Debug, Serialize, Deserialize)]
struct SessionData {
    // ---
    user_id: Option<Uuid>,
    username: Option<String>,
    expires_at: i64,
}

/// A validated session as seen by handlers.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    // ---
    pub token: String,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
}

impl SessionInfo {
    /// The session's identity, or `Unauthorized` for anonymous sessions.
    /// Linking and credential-management flows derive their target user
    /// from here and never from a request parameter.
    pub fn require_user(&self) -> AuthResult<Uuid> {
        // ---
        self.user_id
            .ok_or(AuthError::Unauthorized("session has no bound identity"))
    }
}

// ---

fn session_key(token: &str) -> String {
    // ---
    format!("session:{token}")
}

/// Creates a new anonymous session and stores it in Redis.
///
/// Issued on first contact with an unauthenticated client; carries no
/// identity until a verification path calls [`bind_identity`].
pub async fn start_session(
    redis_conn: &mut MultiplexedConnection,
    ttl: Duration,
) -> AuthResult<String> {
    // ---
    let token = Uuid::new_v4().to_string();
    let expires_at = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;

    let session_data = SessionData {
        user_id: None,
        username: None,
        expires_at,
    };

    let session_json = serde_json::to_string(&session_data)?;

    redis_conn
        .set_ex::<_, _, ()>(session_key(&token), session_json, ttl.as_secs())
        .await?;

    tracing::debug!("started anonymous session");

    Ok(token)
}

/// Binds a verified identity to an existing session.
///
/// Invoked only after successful password or passkey verification. The
/// record is rewritten with a fresh TTL so the authenticated session gets
/// the full lifetime.
pub async fn bind_identity(
    redis_conn: &mut MultiplexedConnection,
    token: &str,
    user_id: Uuid,
    username: String,
    ttl: Duration,
) -> AuthResult<()> {
    // ---
    let key = session_key(token);
    let existing: Option<String> = redis_conn.get(&key).await?;
    if existing.is_none() {
        return Err(AuthError::Unauthorized("session missing or expired"));
    }

    let expires_at = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
    let session_data = SessionData {
        user_id: Some(user_id),
        username: Some(username.clone()),
        expires_at,
    };
    let session_json = serde_json::to_string(&session_data)?;

    redis_conn
        .set_ex::<_, _, ()>(&key, session_json, ttl.as_secs())
        .await?;

    tracing::info!("bound identity to session for user: {}", username);

    Ok(())
}

/// Looks up a session by token. Anonymous sessions come back with no
/// identity; missing or expired tokens are `Unauthorized`.
pub async fn current_identity(
    redis_conn: &mut MultiplexedConnection,
    token: &str,
) -> AuthResult<SessionInfo> {
    // ---
    let session_json: Option<String> = redis_conn.get(session_key(token)).await?;

    let Some(session_json) = session_json else {
        return Err(AuthError::Unauthorized("session missing or expired"));
    };

    let data: SessionData = serde_json::from_str(&session_json)?;

    // Redis TTL already bounds the record lifetime; the embedded timestamp
    // guards against clock drift between issuance and expiry updates.
    if chrono::Utc::now().timestamp() >= data.expires_at {
        let _: () = redis_conn.del(session_key(token)).await?;
        return Err(AuthError::Unauthorized("session expired"));
    }

    Ok(SessionInfo {
        token: token.to_string(),
        user_id: data.user_id,
        username: data.username,
    })
}

/// Invalidates a session token. Idempotent.
pub async fn end_session(redis_conn: &mut MultiplexedConnection, token: &str) -> AuthResult<()> {
    // ---
    let _: () = redis_conn.del(session_key(token)).await?;

    tracing::debug!("ended session");

    Ok(())
}

// ---

/// Extracts the bearer session token from the Authorization header.
///
/// Expects header format: "Authorization: Bearer <token>"
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    // ---
    let auth_header = headers
        .get("authorization")
        .ok_or(AuthError::Unauthorized("missing Authorization header"))?
        .to_str()
        .map_err(|_| AuthError::Unauthorized("malformed Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthorized("Authorization header missing Bearer prefix"))
}

/// Returns the caller's session, minting a fresh anonymous one when the
/// request carries no usable token.
///
/// Used by the endpoints that are a client's first contact with the
/// service (ceremony starts, password login): a missing, malformed, or
/// expired bearer token simply means the caller starts over anonymous.
pub async fn get_or_start(
    headers: &HeaderMap,
    redis_conn: &mut MultiplexedConnection,
    ttl: Duration,
) -> AuthResult<SessionInfo> {
    // ---
    if let Ok(token) = bearer_token(headers) {
        match current_identity(redis_conn, token).await {
            Ok(info) => return Ok(info),
            Err(AuthError::Unauthorized(_)) => {
                tracing::debug!("stale session token on first-contact endpoint; starting fresh");
            }
            Err(err) => return Err(err),
        }
    }

    let token = start_session(redis_conn, ttl).await?;
    Ok(SessionInfo {
        token,
        user_id: None,
        username: None,
    })
}

/// Extracts and validates the caller's session from request headers.
pub async fn extract_session(
    headers: &HeaderMap,
    redis_conn: &mut MultiplexedConnection,
) -> AuthResult<SessionInfo> {
    // ---
    let token = bearer_token(headers)?;
    current_identity(redis_conn, token).await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parses_well_formed_header() {
        // ---
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc-123"),
        );
        assert_eq!(bearer_token(&headers).unwrap(), "abc-123");
    }

    #[test]
    fn bearer_token_rejects_missing_header() {
        // ---
        let headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn bearer_token_rejects_wrong_scheme() {
        // ---
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn anonymous_session_has_no_user() {
        // ---
        let info = SessionInfo {
            token: "t".into(),
            user_id: None,
            username: None,
        };
        assert!(matches!(
            info.require_user(),
            Err(AuthError::Unauthorized(_))
        ));
    }
}
