//! POST /summarize — fixed-count bullet summary of a document's recent chunks.

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
use ragline_chat::Summary;
use ragline_core::with_deadline;

const DEFAULT_NUM_BULLETS: usize = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/summarize", post(summarize))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub num_bullets: Option<i64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub instruction: String,
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<Summary>, ApiError> {
    let Json(req) = payload?;
    let started = Instant::now();
    let num_bullets = match req.num_bullets {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_NUM_BULLETS,
    };

    let summary = with_deadline(
        state.config.timeouts.query,
        state
            .synthesizer
            .summarize(&req.document_id, num_bullets, &req.category, &req.instruction),
    )
    .await?;

    record_audit(
        &state,
        "/summarize",
        started,
        Some(summary.meta.prompt_tokens),
        Some(summary.meta.completion_tokens),
    );
    Ok(Json(summary))
}
