//! Business API Tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use turnoya_api::domain::UserRole;
use uuid::Uuid;

use crate::common::TestApp;

#[tokio::test]
async fn test_nearby_rejects_out_of_range_latitude() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/business/nearby?latitude=100&longitude=-74.1")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "La latitud debe estar entre -90 y 90");
}

#[tokio::test]
async fn test_nearby_rejects_non_positive_radius() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/business/nearby?latitude=4.6&longitude=-74.1&radiusKm=0")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_requires_token() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/business", &json!({"name": "Barbería"})).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_with_malformed_json_is_bad_request() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::BusinessOwner);

    let response = app
        .json("POST", "/api/business", &json!({"unexpected": true}), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_multipart_create_requires_data_part() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::BusinessOwner);
    let body = concat!(
        "--turnoya\r\n",
        "Content-Disposition: form-data; name=\"images\"; filename=\"front.png\"\r\n",
        "Content-Type: image/png\r\n\r\n",
        "not-really-a-png\r\n",
        "--turnoya--\r\n",
    );

    let response = app
        .send(
            Request::post("/api/business")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "multipart/form-data; boundary=turnoya")
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "El campo data es requerido");
}

#[tokio::test]
async fn test_settings_update_requires_token() {
    let app = TestApp::new().await;
    let uri = format!("/api/business/{}/settings", Uuid::new_v4());

    let response = app.json("PUT", &uri, &json!({}), None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_schedule_writes_require_token() {
    let app = TestApp::new().await;
    let body = json!({"businessId": Uuid::new_v4(), "workingDays": []});

    let business = app.post_json("/api/business-schedules", &body).await;
    let employee = app.post_json("/api/employee-schedules", &body).await;

    assert_eq!(business.status, StatusCode::UNAUTHORIZED);
    assert_eq!(employee.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_writes_require_token() {
    let app = TestApp::new().await;
    let uri = format!("/api/services/business/{}", Uuid::new_v4());

    let response = app
        .post_json(&uri, &json!({"name": "Corte", "price": 20000, "durationMinutes": 30}))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
