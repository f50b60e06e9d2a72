// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dynamic client registration (RFC 7591 subset).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::models::ClientRegistration;
use crate::services::random::random_token;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

const CLIENT_ID_BYTES: usize = 16;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/register", post(register_client))
}

/// Registration request body.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 10),
        custom(function = "validate_redirect_uris")
    )]
    pub redirect_uris: Vec<String>,
    #[validate(length(min = 1, max = 100))]
    pub client_name: Option<String>,
    #[validate(url)]
    pub client_uri: Option<String>,
    #[validate(url)]
    pub logo_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub client_id: String,
    pub client_id_issued_at: i64,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<&'static str>,
    pub response_types: Vec<&'static str>,
    pub token_endpoint_auth_method: &'static str,
}

/// Absolute http(s) URIs without fragments; plain http only for loopback.
fn validate_redirect_uris(uris: &Vec<String>) -> std::result::Result<(), ValidationError> {
    for uri in uris {
        if let Some(reason) = redirect_uri_problem(uri) {
            let mut err = ValidationError::new("redirect_uri");
            err.message = Some(Cow::Owned(format!("{}: {}", uri, reason)));
            return Err(err);
        }
    }
    Ok(())
}

fn redirect_uri_problem(uri: &str) -> Option<&'static str> {
    if uri.contains('#') {
        return Some("must not contain a fragment");
    }
    let rest = if let Some(rest) = uri.strip_prefix("https://") {
        rest
    } else if let Some(rest) = uri.strip_prefix("http://") {
        let host = rest.split(['/', '?']).next().unwrap_or_default();
        let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
        if !matches!(host, "localhost" | "127.0.0.1" | "[::1]") {
            return Some("http is only allowed for loopback hosts");
        }
        rest
    } else {
        return Some("must be an absolute http(s) URI");
    };

    if rest.is_empty() || rest.starts_with('/') {
        return Some("missing host");
    }
    None
}

/// `POST /register`
async fn register_client(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response> {
    req.validate()
        .map_err(|e| AppError::InvalidClientMetadata(e.to_string()))?;

    let now = chrono::Utc::now();
    let client_id = random_token(CLIENT_ID_BYTES)?;
    let client_name = req
        .client_name
        .clone()
        .unwrap_or_else(|| "Unnamed application".to_string());

    let mut metadata = BTreeMap::new();
    if let Some(uri) = &req.client_uri {
        metadata.insert("client_uri".to_string(), uri.clone());
    }
    if let Some(uri) = &req.logo_uri {
        metadata.insert("logo_uri".to_string(), uri.clone());
    }

    let registration = ClientRegistration {
        client_id: client_id.clone(),
        redirect_uris: req.redirect_uris.iter().cloned().collect::<BTreeSet<_>>(),
        client_name: client_name.clone(),
        metadata,
        created_at: format_utc_rfc3339(now),
    };
    state.clients.register_client(&registration).await?;

    tracing::info!(
        client_id = %client_id,
        redirect_uris = registration.redirect_uris.len(),
        "Registered client"
    );

    let body = RegisterResponse {
        client_id,
        client_id_issued_at: now.timestamp(),
        client_name,
        redirect_uris: registration.redirect_uris.into_iter().collect(),
        grant_types: vec!["authorization_code"],
        response_types: vec!["code"],
        token_endpoint_auth_method: "none",
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}
