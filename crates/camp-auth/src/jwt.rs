//! Bearer tokens
//!
//! Kiosk tablets exchange a staff session for a short-lived token so they
//! can call the API without holding the session cookie.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use camp_core::Id;

const ISSUER: &str = "camphq";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub jti: String,
    /// Role at issue time; the user is reloaded on every request regardless
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token is expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Create a token for `user_id` valid for `ttl_seconds`
    pub fn create_token(
        &self,
        user_id: Id,
        role: &str,
        tenant_id: Option<Id>,
        ttl_seconds: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl_seconds).max(0) as usize,
            iat: now.max(0) as usize,
            iss: ISSUER.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            tenant_id,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }

    pub fn user_id(&self, token: &str) -> Result<Id, JwtError> {
        self.validate_token(token)?
            .sub
            .parse()
            .map_err(|_| JwtError::Invalid("Invalid user ID in token".to_string()))
    }
}

/// Token from an `Authorization: Bearer ...` header value
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes";

    #[test]
    fn test_create_and_validate_token() {
        let service = JwtService::new(SECRET);
        let token = service.create_token(7, "coach", Some(3), 3600).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "coach");
        assert_eq!(claims.tenant_id, Some(3));
        assert_eq!(service.user_id(&token).unwrap(), 7);
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new(SECRET);
        let token = service.create_token(7, "coach", Some(3), -60).unwrap();
        assert!(matches!(service.validate_token(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = JwtService::new(SECRET).create_token(1, "hq_admin", None, 60).unwrap();
        let other = JwtService::new(b"another-secret-key-at-least-32-bytes");
        assert!(matches!(other.validate_token(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
