// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encryption of Props at rest.
//!
//! Props are sealed with AES-256-GCM before the grant store sees them, with the
//! grant ID as associated data so a sealed blob cannot be moved onto another
//! grant. Format: `base64(nonce || ciphertext || tag)`.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::models::Props;

const NONCE_LEN: usize = 12;

/// Props sealing errors.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("sealed props are malformed")]
    Malformed,

    #[error("sealed props failed authentication")]
    Authentication,

    #[error("props serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Seals and opens [`Props`].
#[derive(Clone)]
pub struct PropsSealer {
    cipher: Aes256Gcm,
}

impl PropsSealer {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    pub fn seal(&self, props: &Props, grant_id: &str) -> Result<String, SealError> {
        let plaintext = serde_json::to_vec(props)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: grant_id.as_bytes(),
                },
            )
            .map_err(|_| SealError::Authentication)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    pub fn open(&self, sealed: &str, grant_id: &str) -> Result<Props, SealError> {
        let blob = BASE64.decode(sealed).map_err(|_| SealError::Malformed)?;
        if blob.len() <= NONCE_LEN {
            return Err(SealError::Malformed);
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: grant_id.as_bytes(),
                },
            )
            .map_err(|_| SealError::Authentication)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}
