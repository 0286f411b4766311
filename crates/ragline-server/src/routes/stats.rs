//! Health and store statistics.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::error::ApiError;
use crate::state::AppState;
use ragline_store::StoreStats;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(get_stats))
}

/// GET /health — liveness.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /stats — document, chunk and index counts.
async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StoreStats>, ApiError> {
    Ok(Json(state.store.stats()?))
}
