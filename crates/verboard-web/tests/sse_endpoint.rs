//! Integration test for SSE endpoint

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;
use verboard_core::{ManagerConfig, VersionManager};

#[tokio::test]
async fn test_sse_endpoint_exists() {
    let temp_dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(VersionManager::new(ManagerConfig::from_root(temp_dir.path())));

    let router = verboard_web::create_router(Arc::clone(&manager), None);

    let request = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    assert!(content_type.is_some());
    assert!(content_type.unwrap().contains("text/event-stream"));

    // The stream holds a hub session until it is dropped
    assert_eq!(manager.hub().session_count(), 1);
    drop(response);
    assert_eq!(manager.hub().session_count(), 0);
}

#[tokio::test]
async fn test_sse_requires_token_when_configured() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = ManagerConfig::from_root(temp_dir.path());
    config.auth_token = Some("s3cret".to_string());
    let manager = Arc::new(VersionManager::new(config));

    let request = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();
    let response = verboard_web::create_router(Arc::clone(&manager), None)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(manager.hub().session_count(), 0);

    let request = Request::builder()
        .uri("/api/events?token=s3cret")
        .body(Body::empty())
        .unwrap();
    let response = verboard_web::create_router(Arc::clone(&manager), None)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
