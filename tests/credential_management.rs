//! Integration tests for the credential management endpoints.
//!
//! Real passkeys require an authenticator, so listing is exercised against
//! accounts with no credentials and deletion against ids the session does
//! not own. Ownership enforcement on deletion is covered at the handler
//! boundary: the response for "someone else's credential" must match the
//! response for "no such credential".

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use clubpass::create_router;
use once_cell::sync::Lazy;
use serde_json::json;
use tokio::runtime::Runtime;
use tower::ServiceExt;

mod common;

static TEST_RUNTIME: Lazy<Runtime> =
    Lazy::new(|| Runtime::new().expect("failed to create Tokio runtime"));

pub fn run_async<F>(fut: F)
where
    F: std::future::Future<Output = ()>,
{
    TEST_RUNTIME.block_on(fut)
}

async fn response_body(response: axum::response::Response) -> serde_json::Value {
    // ---
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Registers a password account and returns its authenticated session token.
async fn authenticated_token(prefix: &str) -> String {
    // ---
    let (username, email) = common::unique_identity(prefix);
    let app = create_router().expect("Failed to create router");
    let request = Request::builder()
        .method("POST")
        .uri("/password/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "username": username, "email": email, "password": "a fine passphrase" })
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    response_body(response).await["session_token"]
        .as_str()
        .unwrap()
        .to_string()
}

// ============================================================================
// Listing Tests
// ============================================================================

#[test]
fn test_list_requires_authenticated_session() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let app = create_router().expect("Failed to create router");
        let request = Request::builder()
            .method("GET")
            .uri("/passkey/credentials")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    })
}

#[test]
fn test_list_is_empty_for_password_only_account() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let token = authenticated_token("cred_list").await;

        let app = create_router().expect("Failed to create router");
        let request = Request::builder()
            .method("GET")
            .uri("/passkey/credentials")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_body(response).await;
        assert_eq!(json["credentials"].as_array().unwrap().len(), 0);
    })
}

// ============================================================================
// Deletion Tests
// ============================================================================

#[test]
fn test_delete_unknown_credential_is_rejected() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let token = authenticated_token("cred_del").await;

        // Valid base64, but no such credential exists
        let app = create_router().expect("Failed to create router");
        let request = Request::builder()
            .method("DELETE")
            .uri("/passkey/credentials/AAAAAAAA")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = response_body(response).await;
        assert_eq!(json["error"], "Authentication failed");
    })
}

#[test]
fn test_delete_rejects_malformed_credential_id() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let token = authenticated_token("cred_bad_id").await;

        let app = create_router().expect("Failed to create router");
        let request = Request::builder()
            .method("DELETE")
            .uri("/passkey/credentials/%21%40%23")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    })
}
