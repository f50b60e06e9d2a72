//! Grant and authorization-code records held by the token store.

use serde::{Deserialize, Serialize};

use crate::models::ScopeSet;

/// A completed downstream authorization, keyed by `grant_id`.
///
/// Props are stored sealed; only the bridge's props key can open them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grant_id: String,
    pub client_id: String,
    /// Internal user the grant belongs to
    pub user_id: String,
    pub redirect_uri: String,
    pub scopes: ScopeSet,
    /// AES-GCM sealed Props (base64)
    pub sealed_props: String,
    /// When the grant was created (ISO 8601)
    pub created_at: String,
}

/// Single-use downstream authorization code, keyed by the SHA-256 of the code.
///
/// The code value itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub grant_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    /// Unix timestamp (seconds) after which the code is rejected
    pub expires_at: i64,
}
