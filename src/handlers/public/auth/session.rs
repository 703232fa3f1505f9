// handlers/public/auth/session.rs - token issuance shared by every login-like flow

use axum::http::StatusCode;
use serde_json::Value;

use crate::api::format::user_data;
use crate::auth::{auth_cookie, sign_token};
use crate::config;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};

/// Sign a token for `user` and return it in the body and as the `jwt` cookie
pub fn session_response(user: &User, status: StatusCode) -> ApiResult<Value> {
    let cfg = config::config();
    let token = sign_token(user.id)?;
    let cookie = auth_cookie(&token, cfg.security.jwt_expires_in_secs, cfg.is_production());

    Ok(ApiResponse::with_status(user_data(user), status).meta("token", token).cookie(cookie))
}
