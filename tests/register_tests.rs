// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dynamic client registration tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

mod common;

use common::{body_json, body_string, create_test_app, get, TestApp};

async fn register(app: &TestApp, body: serde_json::Value) -> axum::response::Response {
    app.send(
        Request::builder()
            .method("POST")
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_registered_client_can_authorize() {
    let app = create_test_app().await;

    let response = register(
        &app,
        json!({
            "redirect_uris": ["https://tool.example/oauth/callback"],
            "client_name": "Inventory Tool",
            "client_uri": "https://tool.example"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let client_id = body["client_id"].as_str().unwrap().to_string();
    assert!(!client_id.is_empty());
    assert_eq!(body["token_endpoint_auth_method"], "none");
    assert_eq!(
        body["redirect_uris"],
        json!(["https://tool.example/oauth/callback"])
    );

    // Sole redirect URI is used when the request omits it.
    let consent = app
        .send(get(
            &format!("/authorize?response_type=code&client_id={}", client_id),
            &[],
        ))
        .await;
    assert_eq!(consent.status(), StatusCode::OK);
    let html = body_string(consent).await;
    assert!(html.contains("Inventory Tool"));
    assert!(html.contains("https://tool.example/oauth/callback"));
}

#[tokio::test]
async fn test_register_rejects_bad_metadata() {
    let app = create_test_app().await;

    for body in [
        json!({ "redirect_uris": [] }),
        json!({ "redirect_uris": ["http://tool.example/cb"] }),
        json!({ "redirect_uris": ["https://tool.example/cb#frag"] }),
        json!({ "redirect_uris": ["https://tool.example/cb"], "client_uri": "nope" }),
    ] {
        let response = register(&app, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(body_json(response).await["error"], "invalid_client_metadata");
    }
}

#[tokio::test]
async fn test_register_allows_loopback_http() {
    let app = create_test_app().await;

    let response = register(
        &app,
        json!({ "redirect_uris": ["http://127.0.0.1:33418/callback"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}
