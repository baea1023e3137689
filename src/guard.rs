use std::future::{ready, Ready};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::token::{subject_hash, Claims, TokenAuthority, DEFAULT_SCOPES};

/// Verified session claims, extracted from the `Authorization: Bearer` header
/// before a protected handler runs. Handlers take this as an argument, so the
/// verified context is an explicit value rather than ambient request state.
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl FromRequest for AuthClaims {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_claims(req))
    }
}

fn extract_claims(req: &HttpRequest) -> Result<AuthClaims, ApiError> {
    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| ApiError::Internal("config not registered".into()))?;

    if config.auth_disabled {
        tracing::debug!("Auth guard bypassed (AUTH_DISABLED=true)");
        return Ok(AuthClaims(synthetic_dev_claims()));
    }

    let authority = req
        .app_data::<web::Data<TokenAuthority>>()
        .ok_or_else(|| ApiError::Internal("token authority not registered".into()))?;

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::NoCredential)?;

    let token = header.strip_prefix("Bearer ").ok_or(ApiError::NoCredential)?;

    let claims = authority.verify(token)?;
    Ok(AuthClaims(claims))
}

/// Claims handed out when the guard is disabled for local/test runs.
fn synthetic_dev_claims() -> Claims {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default() as usize;
    Claims {
        sub: subject_hash("dev-bypass"),
        sid: Uuid::new_v4().to_string(),
        did: "dev-bypass".to_string(),
        scope: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        iat: now,
        exp: now + 900,
    }
}
