// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for callers holding a downstream access token.

use crate::error::Result;
use crate::models::UserContext;
use axum::{routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// The bearer middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/me", get(get_me))
}

/// Current caller response.
#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub login: String,
    pub display_name: String,
    pub email: Option<String>,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub privileged: bool,
}

/// Describe the authenticated caller.
async fn get_me(Extension(ctx): Extension<UserContext>) -> Result<Json<MeResponse>> {
    Ok(Json(MeResponse {
        user_id: ctx.props.internal_user_id().to_string(),
        login: ctx.props.provider_login().to_string(),
        display_name: ctx.props.display_name().to_string(),
        email: ctx.props.email().map(str::to_string),
        client_id: ctx.client_id,
        scopes: ctx.scopes.into_iter().collect(),
        privileged: ctx.privileged,
    }))
}
