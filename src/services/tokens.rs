// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Downstream access tokens and authorization-code helpers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::models::request::format_scopes;
use crate::models::Grant;

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (internal user ID)
    pub sub: String,
    pub client_id: String,
    pub grant_id: String,
    /// Space-separated granted scopes
    pub scope: String,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Token endpoint success body.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

/// Issues and verifies HS256 access tokens bound to a grant.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
    issuer: String,
}

impl AccessTokenIssuer {
    pub fn new(key: &[u8; 32], ttl_secs: i64, issuer: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            ttl_secs,
            issuer: issuer.to_string(),
        }
    }

    pub fn issue(&self, grant: &Grant) -> anyhow::Result<IssuedToken> {
        let now = chrono::Utc::now().timestamp();
        let scope = format_scopes(&grant.scopes);
        let claims = AccessClaims {
            sub: grant.user_id.clone(),
            client_id: grant.client_id.clone(),
            grant_id: grant.grant_id.clone(),
            scope: scope.clone(),
            iss: self.issuer.clone(),
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.ttl_secs,
            scope,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AppError::InvalidToken
            })
    }
}

/// SHA-256 of an authorization code, hex encoded. Codes are stored only by hash.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Check a PKCE verifier against the challenge recorded with the code.
///
/// A missing method means `plain`.
pub fn verify_pkce(challenge: &str, method: Option<&str>, verifier: &str) -> bool {
    let computed = match method.unwrap_or("plain") {
        "S256" => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
        "plain" => verifier.to_string(),
        _ => return false,
    };
    computed.as_bytes().ct_eq(challenge.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant() -> Grant {
        Grant {
            grant_id: "g-1".to_string(),
            client_id: "client-a".to_string(),
            user_id: "u-1".to_string(),
            redirect_uri: "https://a.example/cb".to_string(),
            scopes: ["read".to_string(), "write".to_string()].into(),
            sealed_props: String::new(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = AccessTokenIssuer::new(&[1u8; 32], 3600, "https://bridge.example.com");
        let token = issuer.issue(&grant()).unwrap();
        assert_eq!(token.scope, "read write");
        assert_eq!(token.expires_in, 3600);

        let claims = issuer.verify(&token.access_token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.grant_id, "g-1");
        assert_eq!(claims.client_id, "client-a");
    }

    #[test]
    fn test_verify_rejects_other_key_and_issuer() {
        let token = AccessTokenIssuer::new(&[1u8; 32], 3600, "https://bridge.example.com")
            .issue(&grant())
            .unwrap()
            .access_token;

        let other_key = AccessTokenIssuer::new(&[2u8; 32], 3600, "https://bridge.example.com");
        assert!(matches!(other_key.verify(&token), Err(AppError::InvalidToken)));

        let other_iss = AccessTokenIssuer::new(&[1u8; 32], 3600, "https://elsewhere.example");
        assert!(matches!(other_iss.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let issuer = AccessTokenIssuer::new(&[1u8; 32], -3600, "iss");
        let token = issuer.issue(&grant()).unwrap().access_token;
        assert!(matches!(issuer.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_pkce_s256_known_vector() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert!(verify_pkce(challenge, Some("S256"), verifier));
        assert!(!verify_pkce(challenge, Some("S256"), "wrong"));
        assert!(!verify_pkce(challenge, Some("plain"), verifier));
    }

    #[test]
    fn test_pkce_plain_and_unknown_method() {
        assert!(verify_pkce("abc", None, "abc"));
        assert!(verify_pkce("abc", Some("plain"), "abc"));
        assert!(!verify_pkce("abc", Some("S512"), "abc"));
    }

    #[test]
    fn test_hash_code_is_stable_hex() {
        let h = hash_code("code");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_code("code"));
        assert_ne!(h, hash_code("code2"));
    }
}
