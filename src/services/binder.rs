// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upstream callback handling.
//!
//! Every step is terminal on failure. Nothing is written before the user
//! upsert, and the upsert only runs after the identity fetch succeeded.

use std::sync::Arc;

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{AuthorizationRequest, Props};
use crate::services::flow_state::FlowStateSigner;
use crate::services::upstream::UpstreamProvider;

/// Turns an upstream callback into the original request plus bound Props.
#[derive(Clone)]
pub struct CallbackBinder {
    flow_states: FlowStateSigner,
    upstream: Arc<dyn UpstreamProvider>,
    users: Arc<dyn UserStore>,
}

impl CallbackBinder {
    pub fn new(
        flow_states: FlowStateSigner,
        upstream: Arc<dyn UpstreamProvider>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            flow_states,
            upstream,
            users,
        }
    }

    /// Validate the round trip and bind the upstream identity.
    ///
    /// `marker` is the nonce cookie set when the browser was sent upstream.
    pub async fn bind(
        &self,
        state: &str,
        marker: Option<&str>,
        code: &str,
    ) -> Result<(AuthorizationRequest, Props), AppError> {
        let flow = self.flow_states.decode(state)?;
        if !flow.matches_marker(marker) {
            tracing::warn!(
                client_id = %flow.request.client_id,
                has_marker = marker.is_some(),
                "Callback state does not match a pending flow in this browser"
            );
            return Err(AppError::StateTampered);
        }

        let token = self.upstream.exchange_code(code).await?;
        let identity = self.upstream.fetch_identity(&token).await?;

        let user = self.users.upsert_user(&identity).await.map_err(|e| {
            AppError::UpsertFailure(format!("provider_id {}: {}", identity.provider_id, e))
        })?;

        let props = Props::bind(&identity, &user, &token).ok_or_else(|| {
            AppError::UpsertFailure(format!(
                "provider_id {}: store returned record for provider_id {}",
                identity.provider_id, user.provider_id
            ))
        })?;

        tracing::info!(
            client_id = %flow.request.client_id,
            provider_id = identity.provider_id,
            internal_id = %user.internal_id,
            "Upstream identity bound"
        );

        Ok((flow.request, props))
    }
}
