//! Admin login.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;
use vstream_models::{Caller, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// Exchange the configured admin credentials for a bearer token.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let (Some(email), Some(password)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password.as_deref(),
    ) else {
        warn!("Admin login attempted but no admin credentials are configured");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !request.email.eq_ignore_ascii_case(email) || request.password != password {
        warn!(email = %request.email, "Admin login rejected");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let caller = Caller::admin(format!("admin:{}", email.to_ascii_lowercase())).with_email(email);
    let token = state.auth.issue(&caller)?;
    info!(email = %email, "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: caller.id,
            email: email.to_string(),
            role: caller.role,
            is_admin: true,
        },
    }))
}
