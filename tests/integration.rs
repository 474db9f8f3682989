mod common;

use common::TestServer;

#[tokio::test]
#[serial_test::serial]
async fn basic_integration_test() {
    // ---
    // Test that the router can be created successfully
    common::setup_test_env().await;
    let _router = clubpass::create_router().expect("Should be able to create router");
}

#[tokio::test]
#[serial_test::serial]
async fn health_endpoint_works() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body = response.text().await.expect("Failed to read response body");
    assert!(!body.is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn full_health_check_pings_redis() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health?mode=full"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[serial_test::serial]
async fn root_endpoint_lists_api() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let body = response.text().await.expect("Failed to read response body");
    assert!(body.contains("/passkey/register/start"));
    assert!(body.contains("/password/reset/request"));
}

#[tokio::test]
#[serial_test::serial]
async fn invalid_routes_return_404() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/nonexistent"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[serial_test::serial]
async fn server_handles_concurrent_requests() {
    // ---
    let server = TestServer::new().await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let client = server.client.clone();
            let url = server.url("/health");
            tokio::spawn(async move { client.get(url).send().await })
        })
        .collect();

    // All requests should succeed
    for handle in handles {
        let response = handle
            .await
            .expect("Task should not panic")
            .expect("Request should succeed");
        assert_eq!(response.status(), 200);
    }
}

#[tokio::test]
#[serial_test::serial]
async fn server_handles_malformed_json() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/password/login"))
        .header("content-type", "application/json")
        .body("{ invalid json }")
        .send()
        .await
        .expect("Failed to send request");

    // Should return 400 Bad Request
    assert_eq!(response.status(), 400);
}
