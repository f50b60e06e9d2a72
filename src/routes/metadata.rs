// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization server metadata (RFC 8414).

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/.well-known/oauth-authorization-server",
        get(server_metadata),
    )
}

#[derive(Debug, Serialize)]
pub struct ServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: String,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
}

async fn server_metadata(State(state): State<Arc<AppState>>) -> Json<ServerMetadata> {
    let base = &state.config.public_url;
    Json(ServerMetadata {
        issuer: base.clone(),
        authorization_endpoint: format!("{}/authorize", base),
        token_endpoint: format!("{}/token", base),
        registration_endpoint: format!("{}/register", base),
        response_types_supported: vec!["code"],
        grant_types_supported: vec!["authorization_code"],
        code_challenge_methods_supported: vec!["S256", "plain"],
        token_endpoint_auth_methods_supported: vec!["none"],
    })
}
