//! Bearer token issuing and verification
//!
//! Accounts live with the identity provider; this service only needs the
//! subject, the marketplace role and the studio the subject belongs to.

use chrono::{Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

const ACCESS: &str = "access";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("cannot sign token: {0}")]
    Signing(String),

    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("token expired")]
    TokenExpired,

    #[error("expected an access token, got '{0}'")]
    WrongKind(String),
}

/// Marketplace roles carried in the token
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Studio,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Studio => "studio",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    /// Set for studio accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_id: Option<Uuid>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

impl Claims {
    fn access(user_id: Uuid, role: Role, studio_id: Option<Uuid>, ttl_seconds: i64) -> Self {
        let issued = Utc::now();
        Self {
            sub: user_id.to_string(),
            role,
            studio_id,
            jti: Uuid::new_v4().to_string(),
            iat: issued.timestamp(),
            exp: (issued + Duration::seconds(ttl_seconds)).timestamp(),
            token_type: ACCESS.to_string(),
        }
    }

    /// Subject as a user id, when it is one
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Sign an HS256 access token for `user_id`
pub fn generate_access_token(
    user_id: Uuid,
    role: Role,
    studio_id: Option<Uuid>,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    let claims = Claims::access(user_id, role, studio_id, ttl_seconds);
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::Signing(e.to_string()))
}

/// Check signature, expiry and token kind
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::Rejected(e.to_string()),
    })?
    .claims;

    if claims.token_type != ACCESS {
        return Err(JwtError::WrongKind(claims.token_type));
    }
    Ok(claims)
}
