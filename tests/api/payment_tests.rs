//! Payment API Tests

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use turnoya_api::domain::UserRole;
use uuid::Uuid;

use crate::common::{TestApp, EVENTS_SECRET};

const EVENT: &[u8] = br#"{"event":"transaction.updated","data":{"transaction":{"id":"1234-1","reference":"TY-1","status":"APPROVED"}}}"#;

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn test_webhook_without_signature_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.post_raw("/api/payments/webhook", EVENT, &[]).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Firma de webhook inválida");
}

#[tokio::test]
async fn test_webhook_with_wrong_secret_is_unauthorized() {
    let app = TestApp::new().await;
    let signature = sign("some-other-secret", EVENT);

    for path in ["/api/payments/webhook", "/api/payments/wompi/webhook"] {
        let response = app
            .post_raw(path, EVENT, &[("X-Wompi-Signature", &signature)])
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", path);
    }
}

#[tokio::test]
async fn test_signed_malformed_event_is_bad_request() {
    let app = TestApp::new().await;
    let body: &'static [u8] = b"not json";
    let signature = sign(EVENTS_SECRET, body);

    let response = app
        .post_raw("/api/payments/webhook", body, &[("X-Wompi-Signature", &signature)])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_event_without_transaction_is_acknowledged() {
    let app = TestApp::new().await;
    let body: &'static [u8] = br#"{"event":"nequi_token.updated","data":{}}"#;
    let signature = sign(EVENTS_SECRET, body).to_uppercase();

    let response = app
        .post_raw("/api/payments/wompi/webhook", body, &[("X-Wompi-Signature", &signature)])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["outcome"], "ignored");
}

#[tokio::test]
async fn test_intent_requires_token() {
    let app = TestApp::new().await;
    let body = json!({"appointmentId": Uuid::new_v4(), "amount": 20000});

    let response = app.post_json("/api/payments/intent", &body).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_intent_rejects_zero_amount() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::Customer);
    let body = json!({"appointmentId": Uuid::new_v4(), "amount": 0});

    let response = app
        .json("POST", "/api/payments/intent", &body, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "El monto debe ser mayor a cero");
}

#[tokio::test]
async fn test_intent_rejects_amounts_without_exact_cents() {
    let app = TestApp::new().await;
    let token = app.token_for(UserRole::Customer);

    for (amount, message) in [
        (json!(0.001), "El monto admite como máximo dos decimales"),
        (json!(1e17), "El monto excede el máximo permitido"),
    ] {
        let body = json!({"appointmentId": Uuid::new_v4(), "amount": amount});
        let response = app
            .json("POST", "/api/payments/intent", &body, Some(&token))
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.message(), message);
    }
}
