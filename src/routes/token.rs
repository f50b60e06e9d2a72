// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token endpoint: redeems downstream authorization codes.

use axum::{
    extract::{Form, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/token", post(exchange_token))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    grant_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    code_verifier: Option<String>,
}

/// `POST /token` (authorization_code grant only)
async fn exchange_token(
    State(state): State<Arc<AppState>>,
    Form(req): Form<TokenRequest>,
) -> Result<Response> {
    match req.grant_type.as_deref() {
        Some("authorization_code") => {}
        Some(other) => return Err(AppError::UnsupportedGrantType(other.to_string())),
        None => return Err(AppError::BadRequest("missing grant_type".to_string())),
    }

    let code = req
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing code".to_string()))?;
    let client_id = req
        .client_id
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing client_id".to_string()))?;

    if state.clients.find_client(client_id).await?.is_none() {
        return Err(AppError::InvalidClient(format!("unknown client {}", client_id)));
    }

    let grant = state
        .grant_issuer
        .redeem(
            code,
            client_id,
            req.redirect_uri.as_deref(),
            req.code_verifier.as_deref(),
        )
        .await?;

    let token = state.access_tokens.issue(&grant)?;
    tracing::info!(
        client_id,
        grant_id = %grant.grant_id,
        "Access token issued"
    );

    Ok((
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(token),
    )
        .into_response())
}
