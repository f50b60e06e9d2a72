// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upstream identity provider client (GitHub-compatible OAuth apps).
//!
//! Handles:
//! - Authorization URL construction
//! - Code-for-token exchange (one server-to-server POST)
//! - Identity lookup with the fresh access token
//!
//! No call is ever retried: upstream codes are single-use, so a failed
//! exchange fails the whole login attempt.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Identity, UpstreamToken};
use crate::url_utils::with_query;

/// Operations the bridge needs from the upstream provider.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Authorization URL carrying the signed round-trip `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an upstream authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<UpstreamToken, AppError>;

    /// Fetch the identity the token belongs to.
    async fn fetch_identity(&self, token: &UpstreamToken) -> Result<Identity, AppError>;
}

/// Deterministic upstream authorization URL.
pub fn build_authorize_url(
    authorize_endpoint: &str,
    client_id: &str,
    callback_url: &str,
    scopes: &str,
    state: &str,
) -> String {
    with_query(
        authorize_endpoint,
        &[
            ("client_id", client_id),
            ("redirect_uri", callback_url),
            ("response_type", "code"),
            ("scope", scopes),
            ("state", state),
        ],
    )
}

/// GitHub OAuth client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    authorize_endpoint: String,
    token_endpoint: String,
    api_base: String,
    scopes: String,
    callback_url: String,
}

impl GitHubClient {
    /// Create a client from configuration. Every request is bounded by
    /// `upstream_timeout`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .user_agent(concat!("oauth-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            client_id: config.upstream_client_id.clone(),
            client_secret: config.upstream_client_secret.clone(),
            authorize_endpoint: config.upstream_authorize_url.clone(),
            token_endpoint: config.upstream_token_url.clone(),
            api_base: config.upstream_api_url.trim_end_matches('/').to_string(),
            scopes: config.upstream_scopes.clone(),
            callback_url: config.callback_url(),
        })
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Upstream {} failed", what);
            return Err(AppError::Upstream(format!(
                "{} failed with status {}",
                what, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse {} response: {}", what, e)))
    }
}

#[async_trait]
impl UpstreamProvider for GitHubClient {
    fn authorize_url(&self, state: &str) -> String {
        build_authorize_url(
            &self.authorize_endpoint,
            &self.client_id,
            &self.callback_url,
            &self.scopes,
            state,
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<UpstreamToken, AppError> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token exchange failed: {}", e)))?;

        let body: TokenExchangeResponse =
            self.check_response_json(response, "token exchange").await?;
        body.into_token()
    }

    async fn fetch_identity(&self, token: &UpstreamToken) -> Result<Identity, AppError> {
        let response = self
            .http
            .get(format!("{}/user", self.api_base))
            .bearer_auth(&token.access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Identity fetch failed: {}", e)))?;

        let user: GitHubUser = self.check_response_json(response, "identity fetch").await?;
        Ok(user.into())
    }
}

/// Token endpoint body. GitHub reports errors with a 200 status and an
/// `error` field, so both shapes are parsed.
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenExchangeResponse {
    fn into_token(self) -> Result<UpstreamToken, AppError> {
        if let Some(error) = self.error {
            return Err(AppError::Upstream(format!(
                "Token exchange rejected: {}{}",
                error,
                self.error_description
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            )));
        }

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Upstream("Token response missing access_token".to_string()))?;

        let expires_at = match self.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .filter(|d| *d > Duration::zero())
                    .and_then(|d| Utc::now().checked_add_signed(d))
                    .ok_or_else(|| {
                        AppError::Upstream(format!("Token response has invalid expires_in {}", secs))
                    })?,
            ),
            None => None,
        };

        Ok(UpstreamToken {
            access_token,
            scope: self.scope.unwrap_or_default(),
            expires_at,
        })
    }
}

/// Authenticated user profile.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
}

impl From<GitHubUser> for Identity {
    fn from(user: GitHubUser) -> Self {
        let display_name = user
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.login.clone());
        Identity {
            provider_id: user.id,
            login: user.login,
            display_name,
            email: user.email,
            avatar_url: user.avatar_url,
            bio: user.bio,
        }
    }
}
