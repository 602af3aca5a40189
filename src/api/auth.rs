//! Stateless bearer tokens for the single operator role: an HMAC-SHA256 tag
//! over a JSON claims payload, both hex-encoded. No session state is kept;
//! verification only needs the signing secret.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::error::ApiError;
use super::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
}

pub fn issue_token(secret: &str, sub: &str, now: i64, ttl_secs: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    let payload = serde_json::to_vec(&claims).expect("claims serialize");
    let tag = sign(secret, &payload);
    format!("{}.{}", hex::encode(&payload), hex::encode(tag))
}

pub fn verify_token(secret: &str, token: &str, now: i64) -> Result<Claims, TokenError> {
    let (payload_hex, tag_hex) = token.split_once('.').ok_or(TokenError::Malformed)?;
    let payload = hex::decode(payload_hex).map_err(|_| TokenError::Malformed)?;
    let tag = hex::decode(tag_hex).map_err(|_| TokenError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key len");
    mac.update(&payload);
    mac.verify_slice(&tag).map_err(|_| TokenError::BadSignature)?;

    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

fn sign(secret: &str, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key len");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Extractor guarding admin routes: requires a valid, unexpired bearer token.
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))?;

        let claims = verify_token(&state.config.token_secret, token, Utc::now().timestamp())
            .map_err(|e| match e {
                TokenError::Expired => ApiError::Unauthorized("token expired".to_string()),
                _ => ApiError::Unauthorized("invalid token".to_string()),
            })?;
        Ok(AdminUser(claims))
    }
}
