// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upstream OAuth callback.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::routes::found;
use crate::services::flow_state::NONCE_COOKIE;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/callback", get(upstream_callback))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// `GET /callback`
///
/// Binds the upstream identity and sends the browser back to the downstream
/// client with a fresh authorization code. Any failure renders an error page;
/// no redirect to a client URI happens unless the grant was issued.
async fn upstream_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    finish_callback(state, jar, params)
        .await
        .unwrap_or_else(AppError::into_page)
}

async fn finish_callback(
    state: Arc<AppState>,
    jar: CookieJar,
    params: CallbackParams,
) -> Result<Response> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Upstream provider returned an error");
        return Err(AppError::Upstream(format!("authorization refused: {}", error)));
    }

    let flow_state = params.state.ok_or(AppError::StateTampered)?;
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Upstream("callback without code".to_string()))?;

    let marker = jar.get(NONCE_COOKIE).map(|c| c.value().to_string());
    let (request, props) = state
        .binder
        .bind(&flow_state, marker.as_deref(), &code)
        .await?;

    let location = state
        .grant_issuer
        .complete_authorization(&request, props)
        .await?;

    let jar = jar.remove(state.flow_states.removal_cookie(NONCE_COOKIE));
    Ok((jar, found(&location)).into_response())
}
