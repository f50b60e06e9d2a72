// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Self-describing, signed round-trip state.
//!
//! The bridge keeps no session store. The original [`AuthorizationRequest`]
//! travels inside the `state` parameter sent upstream, together with an issue
//! time and a random nonce, all under an HMAC. The nonce is also set as a
//! short-lived cookie on the browser that started the flow; the callback only
//! accepts a state whose nonce matches that cookie, which ties the flow to one
//! browser without any server-side record.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::models::AuthorizationRequest;
use crate::services::random::random_token;
use crate::services::signing::Signer;

/// Cookie marking a consent screen shown to this browser.
pub const CONSENT_COOKIE: &str = "bridge_consent";
/// Cookie marking an upstream round trip started by this browser.
pub const NONCE_COOKIE: &str = "bridge_oauth_nonce";

const NONCE_BYTES: usize = 16;

/// Contents of the signed `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub request: AuthorizationRequest,
    pub nonce: String,
    /// Unix timestamp (seconds)
    pub issued_at: i64,
}

impl FlowState {
    /// Constant-time check of the browser's marker cookie against the nonce.
    pub fn matches_marker(&self, marker: Option<&str>) -> bool {
        match marker {
            Some(marker) => bool::from(self.nonce.as_bytes().ct_eq(marker.as_bytes())),
            None => false,
        }
    }
}

/// Flow state verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state failed integrity check")]
    Tampered,

    #[error("state expired")]
    Expired,
}

impl From<StateError> for AppError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Tampered => AppError::StateTampered,
            StateError::Expired => AppError::StateExpired,
        }
    }
}

/// Issues and verifies [`FlowState`] values.
#[derive(Clone)]
pub struct FlowStateSigner {
    signer: Signer,
    ttl_secs: i64,
    secure_cookies: bool,
}

impl FlowStateSigner {
    pub fn new(key: impl Into<Vec<u8>>, ttl_secs: i64, secure_cookies: bool) -> Self {
        Self {
            signer: Signer::new(key),
            ttl_secs,
            secure_cookies,
        }
    }

    /// Wrap a request in a fresh state (new nonce, current time) and sign it.
    pub fn issue(&self, request: AuthorizationRequest) -> anyhow::Result<(FlowState, String)> {
        let state = FlowState {
            request,
            nonce: random_token(NONCE_BYTES)?,
            issued_at: Utc::now().timestamp(),
        };
        let encoded = self.encode(&state)?;
        Ok((state, encoded))
    }

    pub fn encode(&self, state: &FlowState) -> anyhow::Result<String> {
        let payload = serde_json::to_vec(state)?;
        self.signer.sign(&payload)
    }

    pub fn decode(&self, value: &str) -> Result<FlowState, StateError> {
        self.decode_at(value, Utc::now().timestamp())
    }

    /// Decode against an explicit clock.
    pub fn decode_at(&self, value: &str, now: i64) -> Result<FlowState, StateError> {
        let payload = self.signer.verify(value).ok_or(StateError::Tampered)?;
        let state: FlowState =
            serde_json::from_slice(&payload).map_err(|_| StateError::Tampered)?;

        if now - state.issued_at > self.ttl_secs || state.issued_at > now + 60 {
            return Err(StateError::Expired);
        }
        Ok(state)
    }

    /// Marker cookie for a consent screen; only sent back to `POST /authorize`.
    pub fn consent_cookie(&self, nonce: &str) -> Cookie<'static> {
        self.marker_cookie(CONSENT_COOKIE, nonce, "/authorize")
    }

    /// Marker cookie for an upstream round trip; only sent back to `/callback`.
    pub fn nonce_cookie(&self, nonce: &str) -> Cookie<'static> {
        self.marker_cookie(NONCE_COOKIE, nonce, "/callback")
    }

    /// Removal cookie matching the attributes of a marker cookie.
    pub fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        let path = if name == CONSENT_COOKIE {
            "/authorize"
        } else {
            "/callback"
        };
        Cookie::build(name)
            .path(path)
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build()
    }

    fn marker_cookie(&self, name: &'static str, nonce: &str, path: &'static str) -> Cookie<'static> {
        Cookie::build((name, nonce.to_string()))
            .path(path)
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl_secs))
            .build()
    }
}
