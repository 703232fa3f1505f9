// handlers/public/movies.rs - read-only movie views that need no token

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use serde_json::Value;

use crate::api::format::{genre_data, stats_data};
use crate::handlers::protected::movies_get;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// GET /api/v1/movies/highest-rated - top five by rating
pub async fn highest_rated_get(
    state: State<AppState>,
    Query(mut params): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    params.insert("limit".to_string(), "5".to_string());
    params.insert("sort".to_string(), "-ratings".to_string());
    movies_get(state, Query(params)).await
}

/// GET /api/v1/movies/movie-stats
pub async fn movie_stats_get(State(state): State<AppState>) -> ApiResult<Value> {
    let stats = state.movies.stats().await?;
    Ok(ApiResponse::success(stats_data(&stats)).meta("count", stats.len()))
}

/// GET /api/v1/movies/movies-by-genre/:genre
pub async fn movies_by_genre_get(State(state): State<AppState>, Path(genre): Path<String>) -> ApiResult<Value> {
    let groups = state.movies.by_genre(&genre).await?;
    Ok(ApiResponse::success(genre_data(&groups)).meta("count", groups.len()))
}
