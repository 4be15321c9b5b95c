//! Registration and login paths that are decided before the database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use loomi_integration_tests::{offline_app, request, send};

#[tokio::test]
async fn test_register_reports_every_invalid_field() {
    let app = offline_app();
    let body = json!({ "firstName": "", "email": "not-an-email", "password": "short" });

    let (status, body) = send(&app, request("POST", "/api/register", Some(&body), None)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The given data was invalid.");
    let errors = &body["errors"];
    assert!(errors["firstName"].is_array());
    assert!(errors["lastName"].is_array());
    assert_eq!(errors["email"][0], "The email field must be a valid email address.");
    assert!(errors["password"].is_array());
}

#[tokio::test]
async fn test_login_with_malformed_fields_is_unauthorized() {
    let app = offline_app();

    for body in [
        json!({}),
        json!({ "email": "nobody", "password": "whatever-it-is" }),
        json!({ "email": 42, "password": true }),
    ] {
        let (status, _) = send(&app, request("POST", "/api/login", Some(&body), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "body: {body}");
    }
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = offline_app();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/register")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_profile_requires_a_valid_token() {
    let app = offline_app();

    let (status, body) = send(&app, request("GET", "/api/profile", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Unauthenticated." }));

    let (status, body) = send(&app, request("GET", "/api/profile", None, Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Unauthenticated." }));
}
