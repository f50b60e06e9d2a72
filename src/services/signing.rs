// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Compact HMAC-SHA256 envelope shared by the approval cookie and the flow state.
//!
//! Wire form: `base64url(payload) "." base64url(tag)`. Both halves use the
//! canonical unpadded alphabet, so every character carries meaning and any
//! single-bit change to the string either fails to decode or changes the bytes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies opaque payloads with one key.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Sign `payload` and return the envelope.
    pub fn sign(&self, payload: &[u8]) -> anyhow::Result<String> {
        let tag = self.tag(payload)?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Return the payload if the envelope is well formed and the tag matches.
    pub fn verify(&self, envelope: &str) -> Option<Vec<u8>> {
        let (payload_b64, tag_b64) = envelope.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;

        let expected = self.tag(&payload).ok()?;
        // Slices of different length compare unequal.
        if bool::from(expected.as_slice().ct_eq(tag.as_slice())) {
            Some(payload)
        } else {
            None
        }
    }

    fn tag(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
