// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no token) -> Protected (valid token) -> Elevated (token + admin role).
// The tier a handler lives in decides which middleware `server::app` wraps it in.

pub mod elevated;  // Tier 3: protect + admin_only
pub mod protected; // Tier 2: protect
pub mod public;    // Tier 1: no authentication

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::database::DatabaseManager;
use crate::error::{ApiError, AppError};
use crate::server::AppState;

/// GET /health - liveness plus a database round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "message": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}

/// Fallback for every unmatched method/path pair
pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    ApiError::not_found(format!("Can't find {} on the server", uri.path())).into()
}
