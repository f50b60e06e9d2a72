// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Downstream authorization endpoint: consent prompt and approval.

use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::request::parse_scopes;
use crate::models::{AuthorizationRequest, ClientRegistration};
use crate::routes::found;
use crate::services::approval::APPROVAL_COOKIE;
use crate::services::flow_state::CONSENT_COOKIE;
use crate::url_utils::with_query;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/authorize", get(authorize).post(submit_consent))
}

/// Query parameters of an inbound authorization request.
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default)]
    response_type: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    code_challenge: Option<String>,
    #[serde(default)]
    code_challenge_method: Option<String>,
}

/// Consent form submission.
#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    flow: String,
    decision: String,
}

/// `GET /authorize`
///
/// Validates the client and redirect URI, then either skips straight to the
/// upstream provider (cached approval covers the scopes) or shows consent.
async fn authorize(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    begin_authorization(state, jar, params)
        .await
        .unwrap_or_else(AppError::into_page)
}

async fn begin_authorization(
    state: Arc<AppState>,
    jar: CookieJar,
    params: AuthorizeParams,
) -> Result<Response> {
    let client_id = params
        .client_id
        .clone()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::UnknownClient("missing client_id".to_string()))?;

    let client = state
        .clients
        .find_client(&client_id)
        .await?
        .ok_or_else(|| AppError::UnknownClient(client_id.clone()))?;

    let redirect_uri = resolve_redirect_uri(&client, params.redirect_uri.as_deref())?;

    // From here on the redirect URI is trusted, so protocol errors go back to the client.
    if let Some(error) = protocol_error(&params) {
        tracing::debug!(client_id = %client_id, error, "Rejecting authorization request");
        let mut query = vec![("error", error)];
        if let Some(client_state) = params.state.as_deref() {
            query.push(("state", client_state));
        }
        return Ok(found(&with_query(&redirect_uri, &query)));
    }

    let request = AuthorizationRequest {
        client_id,
        redirect_uri,
        scopes: parse_scopes(params.scope.as_deref()),
        state: params.state,
        code_challenge: params.code_challenge,
        code_challenge_method: params.code_challenge_method,
    };

    let approval = jar.get(APPROVAL_COOKIE).map(|c| c.value());
    if state
        .approvals
        .is_approved(&request.client_id, &request.scopes, approval)
    {
        tracing::info!(client_id = %request.client_id, "Cached approval covers request");
        return start_upstream(&state, jar, request);
    }

    let (flow, encoded) = state.flow_states.issue(request)?;
    let html = state
        .approvals
        .render_consent(&flow.request, &client, &encoded);

    tracing::info!(client_id = %flow.request.client_id, "Showing consent prompt");
    let jar = jar.add(state.flow_states.consent_cookie(&flow.nonce));
    Ok((jar, Html(html)).into_response())
}

/// `POST /authorize`
async fn submit_consent(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<ConsentForm>,
) -> Response {
    record_decision(state, jar, form)
        .await
        .unwrap_or_else(AppError::into_page)
}

async fn record_decision(
    state: Arc<AppState>,
    jar: CookieJar,
    form: ConsentForm,
) -> Result<Response> {
    let flow = state.flow_states.decode(&form.flow)?;
    let marker = jar.get(CONSENT_COOKIE).map(|c| c.value());
    if !flow.matches_marker(marker) {
        tracing::warn!(
            client_id = %flow.request.client_id,
            "Consent submission without matching consent cookie"
        );
        return Err(AppError::StateTampered);
    }

    // The registration may have changed since the prompt was shown.
    let client = state
        .clients
        .find_client(&flow.request.client_id)
        .await?
        .ok_or_else(|| AppError::UnknownClient(flow.request.client_id.clone()))?;
    if !client.has_redirect_uri(&flow.request.redirect_uri) {
        return Err(AppError::RedirectMismatch);
    }

    let jar = jar.remove(state.flow_states.removal_cookie(CONSENT_COOKIE));
    let request = flow.request;

    match form.decision.as_str() {
        "approve" => {
            // Keep scopes approved earlier for the same client.
            let existing = jar.get(APPROVAL_COOKIE).map(|c| c.value());
            let mut scopes = request.scopes.clone();
            if let Some(record) = state
                .approvals
                .existing_approval(&request.client_id, existing)
            {
                scopes.extend(record.approved_scopes);
            }

            let value = state.approvals.record_approval(&request.client_id, &scopes)?;
            let jar = jar.add(state.approvals.approval_cookie(value));

            tracing::info!(client_id = %request.client_id, "Consent approved");
            start_upstream(&state, jar, request)
        }
        "deny" => {
            tracing::info!(client_id = %request.client_id, "Consent denied");
            let mut query = vec![("error", "access_denied")];
            if let Some(client_state) = request.state.as_deref() {
                query.push(("state", client_state));
            }
            Ok((jar, found(&with_query(&request.redirect_uri, &query))).into_response())
        }
        other => Err(AppError::BadRequest(format!("unknown decision: {}", other))),
    }
}

/// Sign a fresh round-trip state, mark this browser and redirect upstream.
fn start_upstream(
    state: &AppState,
    jar: CookieJar,
    request: AuthorizationRequest,
) -> Result<Response> {
    let (flow, encoded) = state.flow_states.issue(request)?;
    let location = state.upstream.authorize_url(&encoded);
    let jar = jar.add(state.flow_states.nonce_cookie(&flow.nonce));

    tracing::info!(
        client_id = %flow.request.client_id,
        "Redirecting to upstream provider"
    );
    Ok((jar, found(&location)).into_response())
}

/// Exact-match redirect URI resolution. Without an explicit URI the client
/// must have exactly one registered.
fn resolve_redirect_uri(client: &ClientRegistration, requested: Option<&str>) -> Result<String> {
    match requested.filter(|r| !r.is_empty()) {
        Some(uri) if client.has_redirect_uri(uri) => Ok(uri.to_string()),
        Some(_) => {
            tracing::warn!(client_id = %client.client_id, "Unregistered redirect_uri");
            Err(AppError::RedirectMismatch)
        }
        None => client
            .default_redirect_uri()
            .map(str::to_string)
            .ok_or(AppError::RedirectMismatch),
    }
}

/// OAuth error code for a request that is well-addressed but malformed.
fn protocol_error(params: &AuthorizeParams) -> Option<&'static str> {
    if params.response_type.as_deref() != Some("code") {
        return Some("unsupported_response_type");
    }
    match (
        params.code_challenge.as_deref(),
        params.code_challenge_method.as_deref(),
    ) {
        (_, Some(method)) if method != "S256" && method != "plain" => Some("invalid_request"),
        (None, Some(_)) => Some("invalid_request"),
        (Some(""), _) => Some("invalid_request"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        response_type: Option<&str>,
        challenge: Option<&str>,
        method: Option<&str>,
    ) -> AuthorizeParams {
        AuthorizeParams {
            response_type: response_type.map(str::to_string),
            client_id: Some("c".to_string()),
            redirect_uri: None,
            scope: None,
            state: None,
            code_challenge: challenge.map(str::to_string),
            code_challenge_method: method.map(str::to_string),
        }
    }

    #[test]
    fn test_protocol_error() {
        assert_eq!(protocol_error(&params(Some("code"), None, None)), None);
        assert_eq!(
            protocol_error(&params(Some("token"), None, None)),
            Some("unsupported_response_type")
        );
        assert_eq!(
            protocol_error(&params(None, None, None)),
            Some("unsupported_response_type")
        );
        assert_eq!(
            protocol_error(&params(Some("code"), Some("abc"), Some("S256"))),
            None
        );
        assert_eq!(
            protocol_error(&params(Some("code"), Some("abc"), Some("S384"))),
            Some("invalid_request")
        );
        assert_eq!(
            protocol_error(&params(Some("code"), None, Some("S256"))),
            Some("invalid_request")
        );
    }

    #[test]
    fn test_resolve_redirect_uri() {
        let mut client = ClientRegistration {
            client_id: "c".to_string(),
            redirect_uris: ["https://a.example/cb".to_string()].into(),
            client_name: "C".to_string(),
            metadata: Default::default(),
            created_at: String::new(),
        };
        assert_eq!(
            resolve_redirect_uri(&client, None).unwrap(),
            "https://a.example/cb"
        );
        assert!(matches!(
            resolve_redirect_uri(&client, Some("https://a.example/cb/")),
            Err(AppError::RedirectMismatch)
        ));

        client.redirect_uris.insert("https://b.example/cb".to_string());
        assert!(matches!(
            resolve_redirect_uri(&client, None),
            Err(AppError::RedirectMismatch)
        ));
        assert_eq!(
            resolve_redirect_uri(&client, Some("https://b.example/cb")).unwrap(),
            "https://b.example/cb"
        );
    }
}
