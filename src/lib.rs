// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth bridge: an authorization server for downstream tool clients that
//! delegates authentication to an upstream OAuth identity provider.
//!
//! The bridge keeps no session store. Consent decisions live in a signed
//! cookie and the pending authorization request rides inside the signed
//! upstream `state`.

pub mod config;
pub mod db;
pub mod error;
pub mod html;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod url_utils;

use std::sync::Arc;

use config::{Config, ConfigError};
use db::{ClientRegistry, GrantStore, UserStore};
use services::{
    AccessTokenIssuer, ApprovalGate, CallbackBinder, FlowStateSigner, GrantIssuer, KeyRing,
    PropsSealer, UpstreamProvider,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub clients: Arc<dyn ClientRegistry>,
    pub upstream: Arc<dyn UpstreamProvider>,
    pub approvals: ApprovalGate,
    pub flow_states: FlowStateSigner,
    pub binder: CallbackBinder,
    pub grant_issuer: GrantIssuer,
    pub access_tokens: AccessTokenIssuer,
}

impl AppState {
    /// Wire the services from configuration and the storage/upstream collaborators.
    pub fn new(
        config: Config,
        clients: Arc<dyn ClientRegistry>,
        users: Arc<dyn UserStore>,
        grants: Arc<dyn GrantStore>,
        upstream: Arc<dyn UpstreamProvider>,
    ) -> Result<Self, ConfigError> {
        let keys = KeyRing::derive(&config.signing_key)?;
        let secure = config.secure_cookies();

        let approvals = ApprovalGate::new(
            keys.approval_cookie.to_vec(),
            config.approval_ttl_secs,
            secure,
        );
        let flow_states =
            FlowStateSigner::new(keys.flow_state.to_vec(), config.state_ttl_secs, secure);
        let binder = CallbackBinder::new(flow_states.clone(), upstream.clone(), users);
        let grant_issuer = GrantIssuer::new(
            clients.clone(),
            grants,
            PropsSealer::new(&keys.props_seal),
            config.auth_code_ttl_secs,
        );
        let access_tokens = AccessTokenIssuer::new(
            &keys.access_token,
            config.access_token_ttl_secs,
            &config.public_url,
        );

        Ok(Self {
            config,
            clients,
            upstream,
            approvals,
            flow_states,
            binder,
            grant_issuer,
            access_tokens,
        })
    }
}
