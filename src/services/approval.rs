// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Consent caching and the consent prompt.
//!
//! Nothing is written server-side: an approval lives only in the signed
//! cookie, and the gate only reads request cookies and produces response
//! cookies.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;

use crate::html;
use crate::models::{AuthorizationRequest, ClientRegistration, ScopeSet};
use crate::services::cookie_codec::{ApprovalRecord, AuthFailure, CookieCodec};

/// Name of the approval cookie.
pub const APPROVAL_COOKIE: &str = "bridge_approval";

/// Decides whether a browser already approved a client.
#[derive(Clone)]
pub struct ApprovalGate {
    codec: CookieCodec,
    ttl_secs: i64,
    secure_cookies: bool,
}

impl ApprovalGate {
    pub fn new(key: impl Into<Vec<u8>>, ttl_secs: i64, secure_cookies: bool) -> Self {
        Self {
            codec: CookieCodec::new(key).with_max_age(ttl_secs),
            ttl_secs,
            secure_cookies,
        }
    }

    /// The verified approval for `client_id`, if the cookie holds one.
    ///
    /// Any verification failure reads as "no approval" so the caller falls
    /// back to the consent prompt without revealing why.
    pub fn existing_approval(
        &self,
        client_id: &str,
        cookie_value: Option<&str>,
    ) -> Option<ApprovalRecord> {
        let record = match self.codec.verify(cookie_value?) {
            Ok(record) => record,
            Err(AuthFailure::InvalidSignature) => {
                tracing::debug!(client_id, "Approval cookie failed verification");
                return None;
            }
            Err(AuthFailure::Expired) => {
                tracing::debug!(client_id, "Approval cookie expired");
                return None;
            }
        };

        (record.client_id == client_id).then_some(record)
    }

    /// True only for a valid cookie for this client covering every requested scope.
    pub fn is_approved(
        &self,
        client_id: &str,
        scopes: &ScopeSet,
        cookie_value: Option<&str>,
    ) -> bool {
        self.existing_approval(client_id, cookie_value)
            .is_some_and(|record| scopes.is_subset(&record.approved_scopes))
    }

    /// Sign a fresh approval for `client_id`.
    pub fn record_approval(&self, client_id: &str, scopes: &ScopeSet) -> anyhow::Result<String> {
        let record = ApprovalRecord {
            client_id: client_id.to_string(),
            approved_scopes: scopes.clone(),
            issued_at: Utc::now().timestamp(),
        };
        self.codec.sign(&record)
    }

    /// Response cookie carrying a signed approval.
    pub fn approval_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((APPROVAL_COOKIE, value))
            .path("/authorize")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl_secs))
            .build()
    }

    /// Render the consent prompt.
    ///
    /// `flow` is the signed state the form posts back.
    pub fn render_consent(
        &self,
        request: &AuthorizationRequest,
        client: &ClientRegistration,
        flow: &str,
    ) -> String {
        let name = html::escape(&client.client_name);

        let scopes = if request.scopes.is_empty() {
            "<li>Basic access to your account</li>".to_string()
        } else {
            request
                .scopes
                .iter()
                .map(|s| format!("<li><code>{}</code></li>", html::escape(s)))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let registered = client
            .redirect_uris
            .iter()
            .map(|u| format!("<li><code>{}</code></li>", html::escape(u)))
            .collect::<Vec<_>>()
            .join("\n");

        let website = client
            .metadata
            .get("client_uri")
            .map(|uri| {
                format!(
                    "<p>Website: <code>{}</code></p>\n",
                    html::escape(uri)
                )
            })
            .unwrap_or_default();

        let body = format!(
            r#"<h1>Authorize {name}</h1>
<p><strong>{name}</strong> (client ID <code>{client_id}</code>) is requesting access to your account.</p>
{website}<p>After you approve, you will be sent to:</p>
<p><code>{redirect_uri}</code></p>
<p>Requested permissions:</p>
<ul>
{scopes}
</ul>
<p>Redirect addresses registered by this application:</p>
<ul>
{registered}
</ul>
<p>Only approve applications you recognise.</p>
<form method="post" action="/authorize">
<input type="hidden" name="flow" value="{flow}">
<div class="actions">
<button type="submit" name="decision" value="approve" class="primary">Approve</button>
<button type="submit" name="decision" value="deny">Cancel</button>
</div>
</form>"#,
            name = name,
            client_id = html::escape(&client.client_id),
            website = website,
            redirect_uri = html::escape(&request.redirect_uri),
            scopes = scopes,
            registered = registered,
            flow = html::escape(flow),
        );

        html::page(&format!("Authorize {}", client.client_name), &body)
    }
}
