// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-purpose keys derived from the master signing key.
//!
//! Every key is an independent HKDF-SHA256 expansion, so a MAC produced for one
//! purpose (say, the approval cookie) never verifies for another (the flow
//! state). Rotating the master key invalidates all of them at once.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::config::ConfigError;

const HKDF_SALT: &[u8] = b"oauth-bridge/v1";

/// Derived key material, one 256-bit key per purpose.
#[derive(Clone)]
pub struct KeyRing {
    pub approval_cookie: [u8; 32],
    pub flow_state: [u8; 32],
    pub props_seal: [u8; 32],
    pub access_token: [u8; 32],
}

impl KeyRing {
    pub fn derive(master: &[u8]) -> Result<Self, ConfigError> {
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), master);
        Ok(Self {
            approval_cookie: expand(&hk, b"approval-cookie")?,
            flow_state: expand(&hk, b"flow-state")?,
            props_seal: expand(&hk, b"props-seal")?,
            access_token: expand(&hk, b"access-token")?,
        })
    }
}

fn expand(hk: &Hkdf<Sha256>, info: &[u8]) -> Result<[u8; 32], ConfigError> {
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .map_err(|e| ConfigError::Invalid(format!("HKDF expansion failed: {}", e)))?;
    Ok(okm)
}
