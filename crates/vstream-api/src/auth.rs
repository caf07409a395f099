//! Bearer token authentication.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use vstream_models::{Caller, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Claims carried by issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    #[serde(alias = "userId")]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Capability value for the access rules.
    ///
    /// A token without a role is a viewer, or an admin if the admin flag is set.
    pub fn caller(&self) -> ApiResult<Caller> {
        let role = match self.role.as_deref() {
            Some(role) => role
                .parse::<Role>()
                .map_err(|e| ApiError::unauthorized(e.to_string()))?,
            None if self.is_admin => Role::Admin,
            None => Role::Viewer,
        };

        Ok(Caller {
            id: self.sub.clone(),
            role,
            is_admin: self.is_admin,
            email: self.email.clone(),
        })
    }
}

/// HS256 signing and verification keys.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AuthKeys {
    pub fn new(secret: &str, ttl: Duration) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::internal("JWT_SECRET must be set"));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Sign a token for `caller`.
    pub fn issue(&self, caller: &Caller) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: caller.id.clone(),
            email: caller.email.clone(),
            role: Some(caller.role.as_str().to_string()),
            is_admin: caller.is_admin,
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))
    }
}

/// Authenticated caller extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.auth.verify(token)?;
        Ok(AuthUser(claims.caller()?))
    }
}
