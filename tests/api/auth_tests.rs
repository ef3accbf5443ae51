//! Authentication API Tests

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;
use turnoya_api::domain::UserRole;

use crate::common::{registration, TestApp};

// ============================================================================
// Token checks
// ============================================================================

#[tokio::test]
async fn test_protected_route_without_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.get("/api/users/me").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Missing authorization header");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .send(
            axum::http::Request::get("/api/users/me")
                .header("Authorization", "Basic dXNlcjpwYXNz")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Invalid authorization header format");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/appointments/my", "not-a-jwt").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Invalid token");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::new().await;
    let token = app.token_with_expiry(UserRole::Customer, Duration::minutes(-10));

    let response = app.get_auth("/api/users/me", &token).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Token expired");
}

#[tokio::test]
async fn test_admin_routes_reject_customers() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::Customer);

    let response = app.get_auth("/api/admin/users", &token).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.message(), "Se requiere rol de administrador");
}

#[tokio::test]
async fn test_admin_routes_require_token_before_role() {
    let app = TestApp::new().await;

    let response = app.get("/api/admin/users").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_requires_token() {
    let app = TestApp::new().await;
    let uri = format!("/api/auth/users/{}/role", uuid::Uuid::new_v4());

    let response = app.json("PATCH", &uri, &json!({"role": "Admin"}), None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test]
async fn test_register_with_weak_password_fails() {
    let app = TestApp::new().await;
    let body = registration("password", "password");

    let response = app.post_json("/api/auth/register", &body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let errors = response.json()["errors"].as_array().cloned().unwrap_or_default();
    assert!(errors.iter().any(|e| e["field"] == "password"));
}

#[tokio::test]
async fn test_register_with_mismatched_confirmation_fails() {
    let app = TestApp::new().await;
    let body = registration("Secreta1!", "Secreta2!");

    let response = app.post_json("/api/auth/register", &body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_invalid_email_fails() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/auth/login", &json!({"email": "nope", "password": "x"}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "El email no es válido");
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::new().await;
    let body = json!({"email": "nope", "password": "x"});
    let limit = app.settings.rate_limit.auth_requests_per_minute + app.settings.rate_limit.auth_burst;

    for _ in 0..limit {
        let response = app.post_json("/api/auth/login", &body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.headers.contains_key("x-ratelimit-remaining"));
    }

    let response = app.post_json("/api/auth/login", &body).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers.contains_key("retry-after"));
}
