//! City Autocomplete API Tests

use axum::http::StatusCode;

use crate::common::TestApp;

#[tokio::test]
async fn test_missing_query_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get("/api/cities/autocomplete").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Query is required.");
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get("/api/cities/autocomplete?query=%20%20&department=Santander").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Query is required.");
}
