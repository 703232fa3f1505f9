// handlers/protected/user.rs - self-service account endpoints

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::api::format::user_data;
use crate::api::ApiJson;
use crate::auth::password::verify_password;
use crate::database::models::UserDraft;
use crate::error::ApiError;
use crate::handlers::public::session_response;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// PATCH /api/v1/user/updateMyPassword - requires the current password, re-issues the token
pub async fn update_my_password_patch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> ApiResult<Value> {
    let current = body.current_password.unwrap_or_default();
    if !verify_password(&current, &user.password_hash).await? {
        return Err(ApiError::unauthorized("The current password you provided is incorrect").into());
    }

    let user = state
        .users
        .update_password(
            user.id,
            body.password.as_deref().unwrap_or_default(),
            body.confirm_password.as_deref().unwrap_or_default(),
        )
        .await?
        .ok_or_else(|| ApiError::unauthorized("The user belonging to this token no longer exists."))?;

    session_response(&user, StatusCode::OK)
}

/// PATCH /api/v1/user/updateMe - name and email only
pub async fn update_me_patch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(draft): ApiJson<UserDraft>,
) -> ApiResult<Value> {
    if draft.password.is_some() || draft.confirm_password.is_some() {
        return Err(ApiError::bad_request("You cannot update your password using this endpoint").into());
    }

    let updated = state
        .users
        .update_profile(user.id, draft)
        .await?
        .ok_or_else(|| ApiError::unauthorized("The user belonging to this token no longer exists."))?;
    Ok(ApiResponse::success(user_data(&updated)))
}

/// DELETE /api/v1/user/deleteMe - deactivate, never remove
pub async fn delete_me_delete(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<()> {
    state.users.deactivate(user.id).await?;
    tracing::info!("User {} deactivated their account", user.id);
    Ok(ApiResponse::no_content())
}
