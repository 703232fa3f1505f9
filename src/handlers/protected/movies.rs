// handlers/protected/movies.rs - movie reads for any logged-in user

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use serde_json::Value;

use crate::api::format::{movie_data, movies_data};
use crate::api::parse_id;
use crate::database::models::MOVIE_FIELDS;
use crate::database::MovieRepository;
use crate::error::ApiError;
use crate::filter::QueryModifier;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// GET /api/v1/movies - filter, sort, project and paginate from the query string
pub async fn movies_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    let modifier = QueryModifier::new(MovieRepository::filter()?, params, &MOVIE_FIELDS)
        .filter()?
        .sort()?
        .limit_fields()?
        .paginate()?;

    let movies = state.movies.find(modifier).await?;
    let results = movies.len();
    Ok(ApiResponse::success(movies_data(movies)).meta("results", results))
}

/// GET /api/v1/movies/:id
pub async fn movie_get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id("id", &id)?;
    let movie = state
        .movies
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie with that ID is not found!"))?;
    Ok(ApiResponse::success(movie_data(&movie)))
}
