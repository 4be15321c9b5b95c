//! Liveness and the response headers every route carries.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use loomi_integration_tests::{offline_app, request, send};
use tower::ServiceExt;

#[tokio::test]
async fn test_health_is_ok_without_database() {
    let app = offline_app();
    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let app = offline_app();
    let mut req = request("GET", "/health", None, None);
    req.headers_mut()
        .insert("x-request-id", "edge-1234".parse().unwrap());

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "edge-1234");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = offline_app();
    let response = app
        .oneshot(request("GET", "/api/does-not-exist", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_a_json_bad_request() {
    let app = offline_app();
    for uri in ["/api/boxes/abc", "/api/articles/12x", "/api/subscriptions/one/reviews"] {
        let (status, body) = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["message"].is_string(), "{uri}: {body}");
    }
}
