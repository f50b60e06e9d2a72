// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (upstream client secret, master signing key) are read once at
//! startup and held in memory; nothing is hard-coded.

use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Minimum length of the master signing key in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Upstream OAuth client ID (public)
    pub upstream_client_id: String,
    /// Externally visible base URL of this bridge, e.g. `https://bridge.example.com`
    pub public_url: String,
    /// Server port
    pub port: u16,
    /// Upstream authorization endpoint
    pub upstream_authorize_url: String,
    /// Upstream token endpoint
    pub upstream_token_url: String,
    /// Upstream REST API base (identity lookups)
    pub upstream_api_url: String,
    /// Scopes requested from the upstream provider
    pub upstream_scopes: String,
    /// Timeout applied to every outbound upstream call
    pub upstream_timeout: Duration,
    /// Lifetime of the approval cookie
    pub approval_ttl_secs: i64,
    /// Lifetime of the signed round-trip state
    pub state_ttl_secs: i64,
    /// Lifetime of a downstream authorization code
    pub auth_code_ttl_secs: i64,
    /// Lifetime of a downstream access token
    pub access_token_ttl_secs: i64,
    /// Upstream logins allowed to use privileged operations
    pub privileged_logins: BTreeSet<String>,
    /// GCP project for Firestore storage; in-memory storage when unset
    pub gcp_project_id: Option<String>,

    // --- Secrets ---
    /// Upstream OAuth client secret
    pub upstream_client_secret: String,
    /// Master key every signing/encryption key is derived from (raw bytes)
    pub signing_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            upstream_client_id: "test_client_id".to_string(),
            public_url: "https://bridge.example.com".to_string(),
            port: 8080,
            upstream_authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            upstream_token_url: "https://github.com/login/oauth/access_token".to_string(),
            upstream_api_url: "https://api.github.com".to_string(),
            upstream_scopes: "read:user user:email".to_string(),
            upstream_timeout: Duration::from_secs(10),
            approval_ttl_secs: 30 * 24 * 60 * 60,
            state_ttl_secs: 600,
            auth_code_ttl_secs: 600,
            access_token_ttl_secs: 3600,
            privileged_logins: BTreeSet::from(["admin-user".to_string()]),
            gcp_project_id: None,
            upstream_client_secret: "test_secret".to_string(),
            signing_key: b"test_signing_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let signing_key = env::var("BRIDGE_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("BRIDGE_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid(format!(
                "BRIDGE_SIGNING_KEY must be at least {} bytes",
                MIN_SIGNING_KEY_LEN
            )));
        }

        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            upstream_client_id: env::var("UPSTREAM_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("UPSTREAM_CLIENT_ID"))?,
            public_url,
            port: env_or("PORT", 8080),
            upstream_authorize_url: env::var("UPSTREAM_AUTHORIZE_URL")
                .unwrap_or_else(|_| "https://github.com/login/oauth/authorize".to_string()),
            upstream_token_url: env::var("UPSTREAM_TOKEN_URL")
                .unwrap_or_else(|_| "https://github.com/login/oauth/access_token".to_string()),
            upstream_api_url: env::var("UPSTREAM_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            upstream_scopes: env::var("UPSTREAM_SCOPES")
                .unwrap_or_else(|_| "read:user user:email".to_string()),
            upstream_timeout: Duration::from_secs(env_or("UPSTREAM_TIMEOUT_SECS", 10)),
            approval_ttl_secs: env_or("APPROVAL_TTL_SECS", 30 * 24 * 60 * 60),
            state_ttl_secs: env_or("STATE_TTL_SECS", 600),
            auth_code_ttl_secs: env_or("AUTH_CODE_TTL_SECS", 600),
            access_token_ttl_secs: env_or("ACCESS_TOKEN_TTL_SECS", 3600),
            privileged_logins: parse_login_list(
                &env::var("PRIVILEGED_LOGINS").unwrap_or_default(),
            ),
            gcp_project_id: env::var("GCP_PROJECT_ID").ok().filter(|p| !p.is_empty()),

            upstream_client_secret: env::var("UPSTREAM_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("UPSTREAM_CLIENT_SECRET"))?,
            signing_key,
        })
    }

    /// Absolute URL the upstream provider redirects back to.
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.public_url)
    }

    /// Whether cookies should carry the `Secure` attribute.
    ///
    /// Only a plain-http localhost deployment drops it.
    pub fn secure_cookies(&self) -> bool {
        !(self.public_url.starts_with("http://localhost")
            || self.public_url.starts_with("http://127.0.0.1"))
    }
}

/// Read an optional variable, falling back to `default` when unset or unparseable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a comma- or whitespace-separated list of upstream logins.
pub fn parse_login_list(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("UPSTREAM_CLIENT_ID", "test_id");
        env::set_var("UPSTREAM_CLIENT_SECRET", " test_secret\n");
        env::set_var("BRIDGE_SIGNING_KEY", "test_signing_key_32_bytes_minimum!!");
        env::set_var("PRIVILEGED_LOGINS", "alice, bob");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.upstream_client_id, "test_id");
        assert_eq!(config.upstream_client_secret, "test_secret");
        assert!(config.privileged_logins.contains("alice"));
        assert!(config.privileged_logins.contains("bob"));
        assert_eq!(config.state_ttl_secs, 600);
    }

    #[test]
    fn test_parse_login_list() {
        let logins = parse_login_list("alice,bob  carol,,");
        assert_eq!(logins.len(), 3);
        assert!(parse_login_list("").is_empty());
    }

    #[test]
    fn test_secure_cookies_only_dropped_for_localhost() {
        let mut config = Config::test_default();
        assert!(config.secure_cookies());

        config.public_url = "http://localhost:8080".to_string();
        assert!(!config.secure_cookies());
        assert_eq!(config.callback_url(), "http://localhost:8080/callback");
    }
}
