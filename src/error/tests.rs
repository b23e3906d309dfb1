use anyhow::anyhow;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::*;

#[test]
fn test_app_error_constructors() {
    let error = AppError::not_found("Bounty not found");
    assert_eq!(error.category, ErrorCategory::NotFound);
    assert_eq!(error.category.status_code(), StatusCode::NOT_FOUND);

    let error = AppError::insufficient_budget("budget is not enough");
    assert_eq!(error.category.status_code(), StatusCode::FORBIDDEN);

    let error = AppError::method_not_allowed("Bounty has already been paid");
    assert_eq!(error.category.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn test_app_error_from_anyhow() {
    let app_error = AppError::from(anyhow!("Test error"));
    assert_eq!(app_error.category, ErrorCategory::InternalError);
    assert_eq!(
        app_error.category.status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_app_error_from_serde_json() {
    let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let app_error = AppError::from(json_error);
    assert_eq!(app_error.category, ErrorCategory::NotAcceptable);
    assert_eq!(app_error.category.status_code(), StatusCode::NOT_ACCEPTABLE);
}

#[test]
fn test_app_error_display() {
    let error = AppError::not_found("Resource not found");
    let display_string = format!("{}", error);
    assert!(display_string.contains("Resource not found"));
    assert!(display_string.contains("NOT_FOUND"));
}

#[test]
fn test_app_error_into_response_statuses() {
    let response = AppError::authentication_error("no pubkey").into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = AppError::withdrawal_cooldown("too soon").into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = AppError::payment_failed("Payment error").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failure_envelope_body() {
    let response = AppError::payment_failed("Payment error").into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(value["success"], serde_json::json!(false));
    assert_eq!(value["error"], serde_json::json!("Payment error"));
}

#[tokio::test]
async fn test_structured_envelope_body() {
    let response = AppError::validation_error("bad input").into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(value["error"]["code"], serde_json::json!("VALIDATION_ERROR"));
    assert_eq!(value["error"]["message"], serde_json::json!("bad input"));
}
