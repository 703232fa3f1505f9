// handlers/elevated/movies.rs - movie writes, admin only

use axum::extract::{Path, State};
use serde_json::Value;

use crate::api::format::movie_data;
use crate::api::{parse_id, ApiJson};
use crate::database::models::MovieDraft;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

const NOT_FOUND: &str = "Movie with that ID is not found!";

/// POST /api/v1/movies
pub async fn movie_post(State(state): State<AppState>, ApiJson(draft): ApiJson<MovieDraft>) -> ApiResult<Value> {
    let movie = state.movies.create(draft).await?;
    Ok(ApiResponse::created(movie_data(&movie)))
}

/// PATCH /api/v1/movies/:id
pub async fn movie_patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<MovieDraft>,
) -> ApiResult<Value> {
    let id = parse_id("id", &id)?;
    let movie = state
        .movies
        .update(id, draft)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::success(movie_data(&movie)))
}

/// DELETE /api/v1/movies/:id
pub async fn movie_delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id("id", &id)?;
    if !state.movies.delete(id).await? {
        return Err(ApiError::not_found(NOT_FOUND).into());
    }
    Ok(ApiResponse::no_content())
}
