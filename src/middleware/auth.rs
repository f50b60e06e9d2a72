// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication for protected operations.

use crate::error::AppError;
use crate::models::request::parse_scopes;
use crate::models::UserContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires a valid downstream access token.
///
/// Rebuilds the caller's [`UserContext`] from the grant on every request and
/// inserts it into the request extensions.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let claims = state.access_tokens.verify(token)?;
    let (grant, props) = state.grant_issuer.open_grant(&claims.grant_id).await?;

    if grant.client_id != claims.client_id || grant.user_id != claims.sub {
        tracing::warn!(grant_id = %claims.grant_id, "Access token does not match its grant");
        return Err(AppError::InvalidToken);
    }

    let privileged = state
        .config
        .privileged_logins
        .contains(props.provider_login());

    let context = UserContext {
        props,
        client_id: claims.client_id,
        scopes: parse_scopes(Some(&claims.scope)),
        privileged,
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Token of an `Authorization: Bearer <token>` value. The scheme is
/// case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}
