//! Authentication
//!
//! Token verification for requests coming through the storefront and the
//! studio dashboard.

mod jwt;

pub use jwt::{generate_access_token, verify_token, Claims, JwtError, Role};

use uuid::Uuid;

/// Holds the signing secret shared with the identity provider
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    access_token_ttl: i64,
}

impl AuthService {
    pub fn new(jwt_secret: String, access_token_ttl: i64) -> Self {
        Self {
            jwt_secret,
            access_token_ttl,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Issue an access token with the configured lifetime
    pub fn issue_token(
        &self,
        user_id: Uuid,
        role: Role,
        studio_id: Option<Uuid>,
    ) -> Result<String, JwtError> {
        generate_access_token(user_id, role, studio_id, &self.jwt_secret, self.access_token_ttl)
    }
}
