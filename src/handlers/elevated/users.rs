// handlers/elevated/users.rs - GET /api/v1/user

use axum::extract::State;
use serde_json::Value;

use crate::api::format::users_data;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

pub async fn users_get(State(state): State<AppState>) -> ApiResult<Value> {
    let users = state.users.find_all().await?;
    Ok(ApiResponse::success(users_data(&users)).meta("result", users.len()))
}
