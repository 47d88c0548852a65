//! HS256 access tokens.
//!
//! Same format the REST API issues at login: a compact JWS whose payload
//! carries `userId`, optional `email`/`role`, and `iat`/`exp` in seconds.

use crate::domain::error::AuthError;
use crate::ports::TimeSource;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Informational only; the user store is authoritative for roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    pub exp: u64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, issued_at: u64, ttl: Duration) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            role: None,
            iat: Some(issued_at),
            exp: issued_at.saturating_add(ttl.as_secs()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

fn mac_for(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

/// Verifies signature and expiry.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Vec<u8>,
    leeway: Duration,
    clock: Arc<dyn TimeSource>,
}

impl TokenVerifier {
    pub fn new(secret: &str, leeway: Duration, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            leeway,
            clock,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut parts = token.trim().split('.');
        let (header_seg, payload_seg, signature_seg) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(AuthError::Malformed("expected three segments".into())),
            };

        let header: Header = decode_segment(header_seg)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_seg)
            .map_err(|e| AuthError::Malformed(format!("signature: {}", e)))?;
        let mut mac = mac_for(&self.key);
        mac.update(header_seg.as_bytes());
        mac.update(b".");
        mac.update(payload_seg.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: Claims = decode_segment(payload_seg)?;
        if self.clock.now() > claims.exp.saturating_add(self.leeway.as_secs()) {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Malformed(e.to_string()))
}

/// Mints tokens with the shared secret (tests and development tooling).
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, serde_json::Error> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );

        let mut mac = mac_for(&self.key);
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }
}
