//! POST /ingest — store and embed pre-split chunks of a document.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use super::error::ApiError;
use super::record_audit;
use crate::state::AppState;
use ragline_core::with_deadline;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ingest", post(ingest))
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub chunks: Vec<String>,
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload?;
    let started = Instant::now();

    let result = with_deadline(
        state.config.timeouts.ingest,
        state
            .ingester
            .ingest(&req.document_id, req.title.as_deref(), &req.chunks),
    )
    .await?;

    record_audit(&state, "/ingest", started, None, None);

    let mut body = serde_json::json!({
        "status": "ingested",
        "chunks": result.chunks,
        "embedded": result.embedded,
        "indexed": result.indexed,
    });
    if !result.warnings.is_empty() {
        body["warnings"] = serde_json::json!(result.warnings);
    }
    Ok(Json(body))
}
