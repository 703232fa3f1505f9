// handlers/public/auth/password.rs - forgot/reset password flow
//
// POST  /api/v1/auth/forgotPassword        - store a reset token hash, mail the raw token
// PATCH /api/v1/auth/resetPassword/:token  - trade a live token for a new password

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::session_response;
use crate::api::ApiJson;
use crate::auth::password::{generate_reset_token, hash_reset_token};
use crate::config;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::EmailMessage;

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

pub async fn forgot_password_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<()> {
    let email = body.email.unwrap_or_default();
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("We could not find the user with given email"))?;

    let cfg = config::config();
    let (raw_token, hashed_token) = generate_reset_token();
    let expires = Utc::now() + Duration::seconds(cfg.security.reset_token_ttl_secs);
    state.users.set_reset_token(user.id, &hashed_token, expires).await?;

    let reset_url = format!("{}/api/v1/auth/resetPassword/{}", base_url(&headers), raw_token);
    let message = EmailMessage {
        to: user.email.clone(),
        subject: "Password change request Received".to_string(),
        body: format!(
            "We have received a password reset request. Please use the below link to reset your password\n\n{}\n\nThis reset password link will be valid only for {} minutes.",
            reset_url,
            cfg.security.reset_token_ttl_secs / 60
        ),
    };

    if let Err(e) = state.mailer.send(message).await {
        tracing::error!("Password reset email to {} failed: {}", user.email, e);
        state.users.clear_reset_token(user.id).await?;
        return Err(ApiError::internal_server_error(
            "There was an error sending password reset email. Please try again later",
        )
        .into());
    }

    Ok(ApiResponse::message("Password reset link sent to the user email"))
}

pub async fn reset_password_patch(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Value> {
    let invalid = || ApiError::bad_request("Token is invalid or has expired!");

    let user = state
        .users
        .find_by_reset_token(&hash_reset_token(&token))
        .await?
        .ok_or_else(invalid)?;

    let user = state
        .users
        .update_password(
            user.id,
            body.password.as_deref().unwrap_or_default(),
            body.confirm_password.as_deref().unwrap_or_default(),
        )
        .await?
        .ok_or_else(invalid)?;

    tracing::info!("Password reset for user {}", user.id);
    session_response(&user, StatusCode::OK)
}

/// `PUBLIC_URL` when configured, otherwise the host the request came in on
fn base_url(headers: &HeaderMap) -> String {
    if let Some(url) = &config::config().server.public_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}
