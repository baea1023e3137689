use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL_SAFE, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ApiError;

/// Minimum accepted length for a client install identifier.
pub const MIN_INSTALL_ID_LEN: usize = 10;

/// Default token lifetime when the configured TTL expression is unparseable.
const DEFAULT_TTL_SECS: u64 = 900;

/// Scopes granted to every anonymous session unless the caller narrows them.
pub const DEFAULT_SCOPES: [&str; 2] = ["create-complaint", "upload-file"];

/// Claims carried by an anonymous session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// SHA-256 of the install identifier (base64url). Stable per device,
    /// never reveals the raw identifier as the primary subject.
    pub sub: String,
    /// Random session id, unique per issuance.
    pub sid: String,
    /// Raw install identifier, carried alongside for correlation.
    pub did: String,
    pub scope: Vec<String>,
    pub iat: usize, // Issued at (Unix timestamp)
    pub exp: usize, // Expiration time (Unix timestamp)
}

/// Result of minting a session credential.
#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub session_id: String,
    pub expires_in: u64,
}

/// Parse a lifetime expression of the form `<integer><unit>` with unit one of
/// s/m/h/d. Anything unparseable falls back to 900 seconds.
pub fn parse_ttl(expr: &str) -> u64 {
    let expr = expr.trim();
    let Some((idx, unit)) = expr.char_indices().last() else {
        return DEFAULT_TTL_SECS;
    };
    let Ok(value) = expr[..idx].parse::<u64>() else {
        return DEFAULT_TTL_SECS;
    };
    let secs = match unit {
        's' => Some(value),
        'm' => value.checked_mul(60),
        'h' => value.checked_mul(3600),
        'd' => value.checked_mul(86400),
        _ => None,
    };
    secs.unwrap_or(DEFAULT_TTL_SECS)
}

/// Derive the stable subject hash for an install identifier.
pub fn subject_hash(install_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"reclamo-device");
    hasher.update(install_id.as_bytes());
    BASE64_URL_SAFE.encode(hasher.finalize())
}

/// Mints and verifies anonymous session credentials. Pure and CPU-bound;
/// shared read-only across workers.
pub struct TokenAuthority {
    secret: String,
    ttl_seconds: u64,
}

impl TokenAuthority {
    pub fn new(secret: &str, ttl_expr: &str) -> Self {
        TokenAuthority {
            secret: secret.to_string(),
            ttl_seconds: parse_ttl(ttl_expr),
        }
    }

    /// Mint a credential for a device install. The session id is a fresh
    /// UUID per call; the subject hash is deterministic for the device.
    pub fn issue(&self, install_id: &str, scopes: Option<Vec<String>>) -> Result<IssuedToken, ApiError> {
        if install_id.len() < MIN_INSTALL_ID_LEN {
            return Err(ApiError::ValidationFailed(format!(
                "installId must be at least {} characters",
                MIN_INSTALL_ID_LEN
            )));
        }

        let session_id = Uuid::new_v4().to_string();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ApiError::Internal("system clock before epoch".into()))?
            .as_secs() as usize;

        let claims = Claims {
            sub: subject_hash(install_id),
            sid: session_id.clone(),
            did: install_id.to_string(),
            scope: scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
            iat: now,
            exp: now + self.ttl_seconds as usize,
        };

        let access_token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))?;

        tracing::info!("Issued anonymous session: {}", session_id);

        Ok(IssuedToken {
            access_token,
            session_id,
            expires_in: self.ttl_seconds,
        })
    }

    /// Verify a presented token. Only HS512 is accepted; a token declaring
    /// any other algorithm is rejected outright.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = true;
        validation.leeway = 30; // clock skew allowance

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::warn!("Token verification failed: {:?}", e.kind());
            ApiError::InvalidCredential
        })?;

        Ok(data.claims)
    }
}
