//! Tests for health check endpoints.
//!
//! These tests verify the health endpoints return correct status and structure.
//! The health registry is process-global, so assertions only rely on state
//! every test in this binary agrees on.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::TestContext;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    for field in [
        "status",
        "analytical_store_connected",
        "backup_store_connected",
        "record_store_connected",
        "pending_records",
        "outstanding_batches",
        "components",
    ] {
        assert!(
            body.get(field).is_some(),
            "Response should have '{}' field",
            field
        );
    }

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );
    assert!(body["pending_records"].is_u64());
    assert!(body["outstanding_batches"].is_u64());
    assert_eq!(body["components"].as_array().map(|c| c.len()), Some(3));
}

/// Backup store reachability is reported after a probe
#[tokio::test]
async fn test_health_reports_probed_backup_store() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.scheduler.check_health().await;

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["backup_store_connected"], true);
    assert_eq!(body["record_store_connected"], true);
}

/// Test /health/ready endpoint once stores have been probed
#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    assert!(ctx.scheduler.check_health().await);

    server.get("/health/ready").await.assert_status_ok();
}

/// Losing the analytical store keeps the service ready while backups work
#[tokio::test]
async fn test_ready_with_analytical_store_down() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.analytical.set_healthy(false);
    assert!(!ctx.scheduler.check_health().await);

    server.get("/health/ready").await.assert_status_ok();
}

/// Test /health/live endpoint always returns 200 when service is running
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

/// Test that health endpoints don't require authentication
#[tokio::test]
async fn test_health_endpoints_no_auth_required() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for path in ["/health", "/health/ready", "/health/live"] {
        let response = server.get(path).await;
        assert_ne!(
            response.status_code(),
            StatusCode::UNAUTHORIZED,
            "{} should not require auth",
            path
        );
    }
}
