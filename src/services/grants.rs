// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Downstream grant issuance and code redemption.
//!
//! This is the only place the authorization flow writes grant state. A grant
//! is registered together with a single-use code; the client gets the code on
//! its registered redirect URI and redeems it once at the token endpoint.

use chrono::Utc;
use std::sync::Arc;

use crate::db::{ClientRegistry, GrantStore};
use crate::error::AppError;
use crate::models::{AuthorizationCode, AuthorizationRequest, Grant, Props};
use crate::services::random::random_token;
use crate::services::sealing::PropsSealer;
use crate::services::tokens::{hash_code, verify_pkce};
use crate::time_utils::format_utc_rfc3339;
use crate::url_utils::with_query;

/// 256-bit authorization codes.
const CODE_BYTES: usize = 32;

/// Registers grants and redeems their codes.
#[derive(Clone)]
pub struct GrantIssuer {
    clients: Arc<dyn ClientRegistry>,
    grants: Arc<dyn GrantStore>,
    sealer: PropsSealer,
    code_ttl_secs: i64,
}

impl GrantIssuer {
    pub fn new(
        clients: Arc<dyn ClientRegistry>,
        grants: Arc<dyn GrantStore>,
        sealer: PropsSealer,
        code_ttl_secs: i64,
    ) -> Self {
        Self {
            clients,
            grants,
            sealer,
            code_ttl_secs,
        }
    }

    /// Register a grant for `props` and return the client redirect URL.
    ///
    /// The redirect URI is checked again against the registration even though
    /// `/authorize` already did: the request has travelled through the browser
    /// and the upstream provider since then.
    pub async fn complete_authorization(
        &self,
        request: &AuthorizationRequest,
        props: Props,
    ) -> Result<String, AppError> {
        let client = self
            .clients
            .find_client(&request.client_id)
            .await?
            .ok_or_else(|| AppError::UnknownClient(request.client_id.clone()))?;

        if !client.has_redirect_uri(&request.redirect_uri) {
            tracing::warn!(
                client_id = %request.client_id,
                "Redirect URI mismatch at grant completion"
            );
            return Err(AppError::RedirectMismatch);
        }

        let grant_id = uuid::Uuid::new_v4().to_string();
        let sealed_props = self
            .sealer
            .seal(&props, &grant_id)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to seal props: {}", e)))?;

        let now = Utc::now();
        let grant = Grant {
            grant_id: grant_id.clone(),
            client_id: request.client_id.clone(),
            user_id: props.internal_user_id().to_string(),
            redirect_uri: request.redirect_uri.clone(),
            scopes: request.scopes.clone(),
            sealed_props,
            created_at: format_utc_rfc3339(now),
        };

        let code = random_token(CODE_BYTES)?;
        let code_record = AuthorizationCode {
            grant_id: grant_id.clone(),
            client_id: request.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: request.code_challenge_method.clone(),
            expires_at: now.timestamp() + self.code_ttl_secs,
        };

        self.grants
            .put_grant(&grant, &hash_code(&code), &code_record)
            .await?;

        tracing::info!(
            client_id = %request.client_id,
            grant_id = %grant_id,
            user_id = %grant.user_id,
            "Grant issued"
        );

        let mut params = vec![("code", code.as_str())];
        if let Some(state) = request.state.as_deref() {
            params.push(("state", state));
        }
        Ok(with_query(&request.redirect_uri, &params))
    }

    /// Redeem an authorization code.
    ///
    /// The code is consumed before any other check, so a failed attempt also
    /// burns it.
    pub async fn redeem(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<Grant, AppError> {
        let record = self
            .grants
            .take_code(&hash_code(code))
            .await?
            .ok_or_else(|| AppError::InvalidGrant("unknown or already used code".to_string()))?;

        if Utc::now().timestamp() > record.expires_at {
            return Err(AppError::InvalidGrant("code expired".to_string()));
        }
        if record.client_id != client_id {
            tracing::warn!(client_id, grant_id = %record.grant_id, "Code presented by another client");
            return Err(AppError::InvalidGrant("code was issued to another client".to_string()));
        }
        if let Some(redirect_uri) = redirect_uri {
            if redirect_uri != record.redirect_uri {
                return Err(AppError::InvalidGrant("redirect_uri mismatch".to_string()));
            }
        }

        match (record.code_challenge.as_deref(), code_verifier) {
            (Some(challenge), Some(verifier)) => {
                if !verify_pkce(challenge, record.code_challenge_method.as_deref(), verifier) {
                    return Err(AppError::InvalidGrant("PKCE verification failed".to_string()));
                }
            }
            (Some(_), None) => {
                return Err(AppError::InvalidGrant("code_verifier required".to_string()));
            }
            (None, _) => {}
        }

        self.grants
            .get_grant(&record.grant_id)
            .await?
            .ok_or_else(|| AppError::InvalidGrant("grant no longer exists".to_string()))
    }

    /// Load a grant and unseal its Props.
    pub async fn open_grant(&self, grant_id: &str) -> Result<(Grant, Props), AppError> {
        let grant = self
            .grants
            .get_grant(grant_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let props = self
            .sealer
            .open(&grant.sealed_props, &grant.grant_id)
            .map_err(|e| {
                tracing::error!(grant_id, error = %e, "Failed to open sealed props");
                AppError::InvalidToken
            })?;

        Ok((grant, props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{ClientRegistration, Identity, UpstreamToken, UserRecord};

    const REDIRECT: &str = "https://client.example/cb";

    async fn issuer() -> (GrantIssuer, MemoryStore) {
        let store = MemoryStore::new();
        store
            .register_client(&ClientRegistration {
                client_id: "client-a".to_string(),
                redirect_uris: [REDIRECT.to_string()].into(),
                client_name: "Client A".to_string(),
                metadata: Default::default(),
                created_at: "2026-01-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();
        let issuer = GrantIssuer::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            PropsSealer::new(&[3u8; 32]),
            600,
        );
        (issuer, store)
    }

    fn props() -> Props {
        let identity = Identity {
            provider_id: 9,
            login: "octocat".to_string(),
            display_name: "Octo".to_string(),
            email: None,
            avatar_url: None,
            bio: None,
        };
        let user = UserRecord::new("u-9".to_string(), &identity, "2026-01-01T00:00:00Z");
        let token = UpstreamToken {
            access_token: "gho_x".to_string(),
            scope: String::new(),
            expires_at: None,
        };
        Props::bind(&identity, &user, &token).unwrap()
    }

    fn request(redirect_uri: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            client_id: "client-a".to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: ["read".to_string()].into(),
            state: Some("client state".to_string()),
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    fn code_from(location: &str) -> String {
        let query = location.split_once('?').unwrap().1;
        let code = query
            .split('&')
            .find_map(|kv| kv.strip_prefix("code="))
            .unwrap();
        urlencoding::decode(code).unwrap().into_owned()
    }

    #[tokio::test]
    async fn test_complete_authorization_echoes_client_state() {
        let (issuer, store) = issuer().await;
        let location = issuer
            .complete_authorization(&request(REDIRECT), props())
            .await
            .unwrap();

        assert!(location.starts_with("https://client.example/cb?code="));
        assert!(location.ends_with("&state=client%20state"));
        assert_eq!(store.grant_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_authorization_rejects_unregistered_redirect() {
        let (issuer, store) = issuer().await;
        let err = issuer
            .complete_authorization(&request("https://evil.example/cb"), props())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RedirectMismatch));
        assert_eq!(store.grant_count(), 0);
    }

    #[tokio::test]
    async fn test_redeem_is_single_use_and_opens_props() {
        let (issuer, _) = issuer().await;
        let location = issuer
            .complete_authorization(&request(REDIRECT), props())
            .await
            .unwrap();
        let code = code_from(&location);

        let grant = issuer
            .redeem(&code, "client-a", Some(REDIRECT), None)
            .await
            .unwrap();
        let (_, opened) = issuer.open_grant(&grant.grant_id).await.unwrap();
        assert_eq!(opened, props());

        let replay = issuer.redeem(&code, "client-a", Some(REDIRECT), None).await;
        assert!(matches!(replay, Err(AppError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_redeem_checks_client_and_pkce() {
        let (issuer, _) = issuer().await;
        let mut req = request(REDIRECT);
        req.code_challenge = Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string());
        req.code_challenge_method = Some("S256".to_string());

        let code = code_from(&issuer.complete_authorization(&req, props()).await.unwrap());
        assert!(matches!(
            issuer.redeem(&code, "client-b", None, None).await,
            Err(AppError::InvalidGrant(_))
        ));

        let code = code_from(&issuer.complete_authorization(&req, props()).await.unwrap());
        assert!(matches!(
            issuer.redeem(&code, "client-a", None, None).await,
            Err(AppError::InvalidGrant(_))
        ));

        let code = code_from(&issuer.complete_authorization(&req, props()).await.unwrap());
        let grant = issuer
            .redeem(
                &code,
                "client-a",
                None,
                Some("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            )
            .await
            .unwrap();
        assert_eq!(grant.client_id, "client-a");
    }
}
