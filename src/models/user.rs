//! User identity models for storage and the upstream exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity as reported by the upstream provider on this login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable numeric identifier assigned by the provider
    pub provider_id: u64,
    /// Login name (mutable upstream)
    pub login: String,
    /// Display name, falling back to the login when unset upstream
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Upstream access token. Lives only in memory during the callback.
#[derive(Clone)]
pub struct UpstreamToken {
    pub access_token: String,
    pub scope: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for UpstreamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamToken")
            .field("access_token", &"<redacted>")
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Canonical local user, keyed by `provider_id` (also used as document ID).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Internal identifier; never changes once assigned
    pub internal_id: String,
    pub provider_id: u64,
    pub login: String,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    /// When the user first connected
    pub created_at: String,
    /// Most recent successful login
    pub last_login: String,
}

impl UserRecord {
    /// Create a fresh record for a first-time login.
    pub fn new(internal_id: String, identity: &Identity, now: &str) -> Self {
        Self {
            internal_id,
            provider_id: identity.provider_id,
            login: identity.login.clone(),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            avatar_url: identity.avatar_url.clone(),
            bio: identity.bio.clone(),
            created_at: now.to_string(),
            last_login: now.to_string(),
        }
    }

    /// Refresh the mutable profile fields, keeping `internal_id` and `created_at`.
    pub fn apply_identity(&mut self, identity: &Identity, now: &str) {
        self.login = identity.login.clone();
        self.display_name = identity.display_name.clone();
        self.email = identity.email.clone();
        self.avatar_url = identity.avatar_url.clone();
        self.bio = identity.bio.clone();
        self.last_login = now.to_string();
    }
}
