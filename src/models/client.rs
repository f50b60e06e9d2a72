//! Downstream client registration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A registered downstream client. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// Opaque client identifier (also used as document ID)
    pub client_id: String,
    /// Exact redirect URIs the client may use
    pub redirect_uris: BTreeSet<String>,
    /// Human-readable name shown on the consent screen
    pub client_name: String,
    /// Additional registration metadata (client_uri, logo_uri, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// When the client registered (ISO 8601)
    pub created_at: String,
}

impl ClientRegistration {
    /// Exact string match against the registered redirect URIs.
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.contains(uri)
    }

    /// The redirect URI to use when a request omits one.
    ///
    /// Only defined when exactly one URI is registered.
    pub fn default_redirect_uri(&self) -> Option<&str> {
        if self.redirect_uris.len() == 1 {
            self.redirect_uris.iter().next().map(String::as_str)
        } else {
            None
        }
    }
}
