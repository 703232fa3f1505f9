// handlers/public/auth/login.rs - POST /api/v1/auth/login

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::session_response;
use crate::api::ApiJson;
use crate::auth::password::verify_password;
use crate::error::ApiError;
use crate::middleware::ApiResult;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Unknown email and wrong password produce the same response
pub async fn login_post(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> ApiResult<Value> {
    let (Some(email), Some(password)) = (
        body.email.filter(|e| !e.trim().is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide email ID & Password for login in!").into());
    };

    let user = state.users.find_by_email(&email).await?;
    let authenticated = match &user {
        Some(user) => verify_password(&password, &user.password_hash).await?,
        None => false,
    };
    let Some(user) = user.filter(|_| authenticated) else {
        tracing::info!("Failed login attempt for {}", email);
        return Err(ApiError::bad_request("Incorrect email or password").into());
    };

    session_response(&user, StatusCode::OK)
}
