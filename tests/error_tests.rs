// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use oauth_bridge::error::AppError;

#[test]
fn test_flow_errors_render_pages() {
    for err in [
        AppError::UnknownClient("x".to_string()),
        AppError::RedirectMismatch,
        AppError::StateTampered,
        AppError::StateExpired,
        AppError::Upstream("x".to_string()),
        AppError::UpsertFailure("x".to_string()),
    ] {
        assert!(err.is_flow_error(), "{:?}", err);
    }

    let err = AppError::BadRequest("Bad Request".to_string());
    assert!(!err.is_flow_error());
}

#[test]
fn test_flow_error_statuses() {
    let cases = [
        (AppError::RedirectMismatch, StatusCode::BAD_REQUEST),
        (AppError::StateExpired, StatusCode::BAD_REQUEST),
        (AppError::Upstream("timeout".to_string()), StatusCode::BAD_GATEWAY),
        (
            AppError::UpsertFailure("db down".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, status) in cases {
        let response = err.into_response();
        assert_eq!(response.status(), status);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        assert!(response.headers().get(header::LOCATION).is_none());
    }
}

#[tokio::test]
async fn test_api_errors_render_oauth_json() {
    let response = AppError::InvalidGrant("code expired".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_description"], "code expired");
}

#[tokio::test]
async fn test_internal_details_are_not_leaked() {
    let response = AppError::Database("connection refused to 10.0.0.7".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("server_error"));
    assert!(!body.contains("10.0.0.7"));
}

#[tokio::test]
async fn test_into_page_renders_storage_errors_as_html() {
    let response = AppError::Database("connection refused to 10.0.0.7".to_string()).into_page();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(response.headers().get(header::LOCATION).is_none());

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("<h1>"));
    assert!(!body.contains("10.0.0.7"));
    assert!(!body.contains("server_error"));
}

#[test]
fn test_into_page_keeps_flow_statuses() {
    assert_eq!(
        AppError::StateExpired.into_page().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        AppError::BadRequest("bad".to_string()).into_page().status(),
        StatusCode::BAD_REQUEST
    );
}
