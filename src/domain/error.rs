//! Application error taxonomy.
//!
//! Internally every failure keeps its precise kind so logs can tell a
//! signature mismatch from a cloned-credential counter regression. At the
//! HTTP boundary the kinds collapse into a handful of uniform messages so
//! that response shape never reveals whether an account, credential, or
//! token exists.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error body returned to clients. Deliberately a single field.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // ---
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// No pending challenge for this session: never issued, expired, or
    /// already consumed. Ceremonies fail closed on this.
    #[error("challenge missing or expired")]
    ChallengeMissingOrExpired,

    /// webauthn-rs rejected the ceremony response: bad signature, origin
    /// mismatch, or relying-party mismatch. Never retried, never partially
    /// applied.
    #[error("ceremony verification failed: {0}")]
    VerificationFailed(#[from] webauthn_rs::prelude::WebauthnError),

    /// The asserted signature counter did not strictly increase. Treated
    /// as evidence of credential cloning.
    #[error("signature counter regression")]
    CounterRegression,

    /// The asserted credential id is not registered.
    #[error("unknown credential")]
    UnknownCredential,

    /// Username, email, or credential id already taken. Recovered from the
    /// store's uniqueness constraint, not surfaced as a raw storage error.
    #[error("duplicate identity")]
    DuplicateIdentity,

    /// Password login rejected: unknown email, passkey-only account, or
    /// hash mismatch. Callers cannot tell which.
    #[error("invalid password credentials")]
    InvalidCredentials,

    /// Password fails the minimum-length policy. The only password failure
    /// that names its cause; it can only occur for the caller's own
    /// plaintext, so there is nothing to enumerate.
    #[error("password does not meet policy")]
    PasswordPolicy,

    /// Reset token not found (never issued, replaced, or already consumed).
    #[error("reset token invalid")]
    ResetTokenInvalid,

    /// Reset token found but past its expiry.
    #[error("reset token expired")]
    ResetTokenExpired,

    /// Missing, malformed, or expired session token on an endpoint that
    /// requires one.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Structurally valid JSON that fails a field-level requirement.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // ---
        let (status, message) = match &self {
            AuthError::ChallengeMissingOrExpired => {
                tracing::warn!("ceremony completion without a pending challenge");
                (StatusCode::BAD_REQUEST, "Challenge not found or expired")
            }

            // Protocol and identity-lookup failures share one message so
            // the response carries no enumeration signal.
            AuthError::VerificationFailed(err) => {
                tracing::warn!("ceremony verification failed: {:?}", err);
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            AuthError::CounterRegression => {
                tracing::error!("signature counter regression; possible cloned credential");
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            AuthError::UnknownCredential => {
                tracing::warn!("assertion for unknown credential id");
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("password login rejected");
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }

            AuthError::DuplicateIdentity => {
                tracing::warn!("registration rejected: identity or credential already exists");
                (
                    StatusCode::CONFLICT,
                    "That username, email, or passkey is already registered",
                )
            }

            AuthError::PasswordPolicy => {
                tracing::debug!("password rejected by policy");
                (
                    StatusCode::BAD_REQUEST,
                    "Password must be at least 8 characters",
                )
            }

            AuthError::ResetTokenInvalid | AuthError::ResetTokenExpired => {
                tracing::warn!("password reset rejected: {}", self);
                (StatusCode::BAD_REQUEST, "Reset link is invalid or has expired")
            }

            AuthError::Unauthorized(reason) => {
                tracing::debug!("unauthorized request: {}", reason);
                (StatusCode::UNAUTHORIZED, "Invalid or expired session")
            }

            AuthError::InvalidRequest(reason) => {
                tracing::debug!("invalid request: {}", reason);
                (StatusCode::BAD_REQUEST, *reason)
            }

            AuthError::Storage(err) => {
                tracing::error!("database error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AuthError::Cache(err) => {
                tracing::error!("redis error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AuthError::Serialization(err) => {
                tracing::error!("serialization error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AuthError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: AuthError) -> StatusCode {
        // ---
        err.into_response().status()
    }

    #[test]
    fn protocol_failures_collapse_to_unauthorized() {
        // ---
        assert_eq!(status_of(AuthError::CounterRegression), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::UnknownCredential), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn reset_failures_share_one_shape() {
        // ---
        assert_eq!(status_of(AuthError::ResetTokenInvalid), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::ResetTokenExpired), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_identity_is_conflict() {
        // ---
        assert_eq!(status_of(AuthError::DuplicateIdentity), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_challenge_is_bad_request() {
        // ---
        assert_eq!(
            status_of(AuthError::ChallengeMissingOrExpired),
            StatusCode::BAD_REQUEST
        );
    }
}
