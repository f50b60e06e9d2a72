// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tamper-evident approval record stored in the browser.
//!
//! Pure: given the key, `sign` and `verify` touch no network or storage.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::ScopeSet;
use crate::services::signing::Signer;

/// Tolerated clock skew when checking `issued_at` (seconds).
const CLOCK_SKEW_SECS: i64 = 60;

/// A user's consent for one client.
///
/// Field order is fixed and scopes are a sorted set, so serialization is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub client_id: String,
    pub approved_scopes: ScopeSet,
    /// Unix timestamp (seconds)
    pub issued_at: i64,
}

/// Approval verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("approval cookie signature is invalid")]
    InvalidSignature,

    #[error("approval cookie expired")]
    Expired,
}

/// Signs and verifies [`ApprovalRecord`]s.
#[derive(Clone)]
pub struct CookieCodec {
    signer: Signer,
    max_age_secs: Option<i64>,
}

impl CookieCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            signer: Signer::new(key),
            max_age_secs: None,
        }
    }

    /// Reject records older than `secs`.
    pub fn with_max_age(mut self, secs: i64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    pub fn sign(&self, record: &ApprovalRecord) -> anyhow::Result<String> {
        let payload = serde_json::to_vec(record)?;
        self.signer.sign(&payload)
    }

    pub fn verify(&self, value: &str) -> Result<ApprovalRecord, AuthFailure> {
        self.verify_at(value, Utc::now().timestamp())
    }

    /// Verify against an explicit clock.
    pub fn verify_at(&self, value: &str, now: i64) -> Result<ApprovalRecord, AuthFailure> {
        let payload = self
            .signer
            .verify(value)
            .ok_or(AuthFailure::InvalidSignature)?;

        let record: ApprovalRecord =
            serde_json::from_slice(&payload).map_err(|_| AuthFailure::InvalidSignature)?;

        if let Some(max_age) = self.max_age_secs {
            if now - record.issued_at > max_age || record.issued_at > now + CLOCK_SKEW_SECS {
                return Err(AuthFailure::Expired);
            }
        }

        Ok(record)
    }
}
