//! Authenticated context bound to a downstream grant.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Identity, ScopeSet, UpstreamToken, UserRecord};

/// Identity context carried by every downstream grant.
///
/// Fields are private: outside of unsealing a stored grant, the only way to
/// build one is [`Props::bind`], which needs the identity fetched in this
/// flow, the record upserted for it and the upstream token used to fetch it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Props {
    internal_user_id: String,
    provider_login: String,
    provider_access_token: String,
    display_name: String,
    email: Option<String>,
}

impl Props {
    /// Bind a freshly fetched identity and its upserted record to the
    /// upstream token. Returns `None` if the record belongs to another
    /// provider account.
    pub fn bind(identity: &Identity, user: &UserRecord, token: &UpstreamToken) -> Option<Self> {
        if identity.provider_id != user.provider_id {
            return None;
        }
        Some(Self {
            internal_user_id: user.internal_id.clone(),
            provider_login: identity.login.clone(),
            provider_access_token: token.access_token.clone(),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
        })
    }

    pub fn internal_user_id(&self) -> &str {
        &self.internal_user_id
    }

    pub fn provider_login(&self) -> &str {
        &self.provider_login
    }

    /// Upstream access token, for operations that call the provider on the user's behalf.
    pub fn provider_access_token(&self) -> &str {
        &self.provider_access_token
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("internal_user_id", &self.internal_user_id)
            .field("provider_login", &self.provider_login)
            .field("provider_access_token", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .finish()
    }
}

/// Context handed to protected operations, reconstructed on every call.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub props: Props,
    pub client_id: String,
    pub scopes: ScopeSet,
    /// Whether the login is on the privileged allow-list
    pub privileged: bool,
}

impl UserContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}
