//! Integration tests for the password reset flow.
//!
//! The reset link travels by email in production, so these tests plant
//! token rows directly in Postgres to drive the confirm endpoint, and
//! verify the two externally observable guarantees: the request endpoint
//! reveals nothing, and a token redeems at most once.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use clubpass::create_router;
use once_cell::sync::Lazy;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
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

async fn post_json(uri: &str, body: serde_json::Value) -> axum::response::Response {
    // ---
    let app = create_router().expect("Failed to create router");
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn test_pool() -> PgPool {
    // ---
    let url = std::env::var("DATABASE_URL").unwrap();
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to test database")
}

/// Registers a password account and returns its email.
async fn register_account(prefix: &str, password: &str) -> String {
    // ---
    let (username, email) = common::unique_identity(prefix);
    let response = post_json(
        "/password/register",
        json!({ "username": username, "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    email
}

/// Plants a reset token for the account, bypassing email delivery.
async fn plant_token(pool: &PgPool, email: &str, token: &str, expires_in: Duration) {
    // ---
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (user_id, token, expires_at)
        SELECT id, $1, $2 FROM users WHERE email = $3
        ON CONFLICT (user_id) DO UPDATE SET token = $1, expires_at = $2
        "#,
    )
    .bind(token)
    .bind(Utc::now() + expires_in)
    .bind(email)
    .execute(pool)
    .await
    .expect("Failed to plant reset token");
}

// ============================================================================
// Reset Request Tests
// ============================================================================

#[test]
fn test_reset_request_does_not_reveal_accounts() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let email = register_account("reset_reveal", "a fine passphrase").await;

        let known = post_json("/password/reset/request", json!({ "email": email })).await;
        let unknown = post_json(
            "/password/reset/request",
            json!({ "email": "nobody@example.com" }),
        )
        .await;

        // Same status and body whether or not the account exists
        assert_eq!(known.status(), StatusCode::ACCEPTED);
        assert_eq!(unknown.status(), StatusCode::ACCEPTED);
        assert_eq!(response_body(known).await, response_body(unknown).await);
    })
}

#[test]
fn test_reset_request_replaces_prior_token() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let email = register_account("reset_replace", "a fine passphrase").await;
        let pool = test_pool().await;

        let first = format!("first_{}", uuid::Uuid::new_v4().simple());
        plant_token(&pool, &email, &first, Duration::hours(1)).await;

        // A new request issues a new token, which replaces the planted one
        let response = post_json("/password/reset/request", json!({ "email": email })).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let confirm = post_json(
            "/password/reset/confirm",
            json!({ "token": first, "new_password": "another passphrase" }),
        )
        .await;
        assert_eq!(confirm.status(), StatusCode::BAD_REQUEST);
    })
}

// ============================================================================
// Reset Confirm Tests
// ============================================================================

#[test]
fn test_reset_confirm_happy_path_is_single_use() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let email = register_account("reset_once", "the old passphrase").await;
        let pool = test_pool().await;

        let token = format!("tok_{}", uuid::Uuid::new_v4().simple());
        plant_token(&pool, &email, &token, Duration::hours(1)).await;

        let response = post_json(
            "/password/reset/confirm",
            json!({ "token": token, "new_password": "the new passphrase" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // The new password works, the old one does not
        let login = post_json(
            "/password/login",
            json!({ "email": email, "password": "the new passphrase" }),
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);

        let old_login = post_json(
            "/password/login",
            json!({ "email": email, "password": "the old passphrase" }),
        )
        .await;
        assert_eq!(old_login.status(), StatusCode::UNAUTHORIZED);

        // Second redemption of the same token fails
        let replay = post_json(
            "/password/reset/confirm",
            json!({ "token": token, "new_password": "yet another passphrase" }),
        )
        .await;
        assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    })
}

#[test]
fn test_reset_confirm_expired_token_matches_invalid_shape() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let email = register_account("reset_expired", "a fine passphrase").await;
        let pool = test_pool().await;

        let token = format!("tok_{}", uuid::Uuid::new_v4().simple());
        plant_token(&pool, &email, &token, Duration::hours(-1)).await;

        let expired = post_json(
            "/password/reset/confirm",
            json!({ "token": token, "new_password": "the new passphrase" }),
        )
        .await;

        let bogus = post_json(
            "/password/reset/confirm",
            json!({ "token": "never_issued", "new_password": "the new passphrase" }),
        )
        .await;

        assert_eq!(expired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bogus.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_body(expired).await, response_body(bogus).await);

        // Expired tokens are removed on touch; a retry is also invalid
        let retry = post_json(
            "/password/reset/confirm",
            json!({ "token": token, "new_password": "the new passphrase" }),
        )
        .await;
        assert_eq!(retry.status(), StatusCode::BAD_REQUEST);
    })
}

#[test]
fn test_reset_confirm_short_password_keeps_token_alive() {
    // ---
    run_async(async {
        // ---
        common::setup_test_env().await;

        let email = register_account("reset_policy", "a fine passphrase").await;
        let pool = test_pool().await;

        let token = format!("tok_{}", uuid::Uuid::new_v4().simple());
        plant_token(&pool, &email, &token, Duration::hours(1)).await;

        // Policy rejection happens before the token is consumed
        let short = post_json(
            "/password/reset/confirm",
            json!({ "token": token, "new_password": "short" }),
        )
        .await;
        assert_eq!(short.status(), StatusCode::BAD_REQUEST);
        assert!(response_body(short).await["error"]
            .as_str()
            .unwrap()
            .contains("at least 8"));

        // The token still redeems
        let ok = post_json(
            "/password/reset/confirm",
            json!({ "token": token, "new_password": "the new passphrase" }),
        )
        .await;
        assert_eq!(ok.status(), StatusCode::OK);
    })
}
