// handlers/public/auth/signup.rs - POST /api/v1/auth/signup

use axum::{extract::State, http::StatusCode};
use serde_json::Value;

use super::session_response;
use crate::api::ApiJson;
use crate::config;
use crate::database::models::UserDraft;
use crate::middleware::ApiResult;
use crate::server::AppState;

pub async fn signup_post(State(state): State<AppState>, ApiJson(mut draft): ApiJson<UserDraft>) -> ApiResult<Value> {
    if !config::config().security.allow_signup_role {
        draft.role = None;
    }

    let user = state.users.create(draft).await?;
    session_response(&user, StatusCode::CREATED)
}
