//! Inbound authorization request, carried through the upstream round trip.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted, de-duplicated scope set. Ordering keeps serialization deterministic.
pub type ScopeSet = BTreeSet<String>;

/// One inbound `/authorize` call. Never stored server-side; it travels
/// inside the signed round-trip state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: ScopeSet,
    /// Client state, echoed back verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

/// Split a space-delimited OAuth `scope` parameter.
pub fn parse_scopes(raw: Option<&str>) -> ScopeSet {
    raw.unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Join a scope set back into the wire form.
pub fn format_scopes(scopes: &ScopeSet) -> String {
    scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}
