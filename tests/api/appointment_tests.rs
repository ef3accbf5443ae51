//! Appointment API Tests
//!
//! Parameter and body checks that run before any database access.

use axum::http::StatusCode;
use serde_json::json;
use test_case::test_case;
use turnoya_api::domain::UserRole;
use uuid::Uuid;

use crate::common::TestApp;

const BUSINESS: &str = "0190f3a0-0000-7000-8000-000000000001";
const SERVICE: &str = "0190f3a0-0000-7000-8000-000000000002";

#[test_case("", "El ID del negocio es requerido" ; "nothing given")]
#[test_case("?serviceId=0190f3a0-0000-7000-8000-000000000002&date=2030-01-15", "El ID del negocio es requerido" ; "business missing")]
#[test_case("?businessId=0190f3a0-0000-7000-8000-000000000001&date=2030-01-15", "El ID del servicio es requerido" ; "service missing")]
#[test_case("?businessId=0190f3a0-0000-7000-8000-000000000001&serviceId=0190f3a0-0000-7000-8000-000000000002", "La fecha es requerida" ; "date missing")]
#[tokio::test]
async fn test_availability_requires_parameters(query: &str, message: &str) {
    let app = TestApp::new().await;

    let response = app
        .get(&format!("/api/appointments/availability{}", query))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), message);
}

#[tokio::test]
async fn test_availability_rejects_malformed_ids() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/appointments/availability?businessId=abc&serviceId=def&date=2030-01-15")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_requires_token() {
    let app = TestApp::new().await;
    let body = json!({
        "businessId": BUSINESS,
        "serviceId": SERVICE,
        "scheduledDate": "2030-01-15T15:00:00Z"
    });

    let response = app.post_json("/api/appointments", &body).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_booking_rejects_long_notes() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::Customer);
    let body = json!({
        "businessId": BUSINESS,
        "serviceId": SERVICE,
        "scheduledDate": "2030-01-15T15:00:00Z",
        "notes": "x".repeat(501)
    });

    let response = app.json("POST", "/api/appointments", &body, Some(&token)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Las notas no pueden exceder 500 caracteres");
}

#[tokio::test]
async fn test_cancel_rejects_long_reason() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::Customer);
    let uri = format!("/api/appointments/{}/cancel", Uuid::new_v4());

    let response = app
        .json("PATCH", &uri, &json!({"reason": "x".repeat(301)}), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[test_case("confirm")]
#[test_case("complete")]
#[test_case("noshow")]
#[test_case("cancel")]
#[tokio::test]
async fn test_status_changes_require_token(action: &str) {
    let app = TestApp::new().await;
    let uri = format!("/api/appointments/{}/{}", Uuid::new_v4(), action);

    let response = app.json("PATCH", &uri, &json!({}), None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
