//! POST /qa — grounded question answering with citations.

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
use ragline_chat::Answer;
use ragline_core::with_deadline;

const DEFAULT_TOP_K: usize = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/qa", post(qa))
}

#[derive(Debug, Deserialize)]
pub struct QaRequest {
    #[serde(default)]
    pub question: String,
    /// Missing or non-positive means the default.
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl QaRequest {
    fn top_k(&self) -> usize {
        match self.top_k {
            Some(k) if k > 0 => k as usize,
            _ => DEFAULT_TOP_K,
        }
    }
}

async fn qa(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QaRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(req) = payload?;
    let started = Instant::now();

    let answer = with_deadline(
        state.config.timeouts.query,
        state.synthesizer.answer(&req.question, req.top_k()),
    )
    .await?;

    record_audit(
        &state,
        "/qa",
        started,
        answer.usage.prompt_tokens,
        answer.usage.completion_tokens,
    );
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_defaults() {
        let parse = |body: &str| serde_json::from_str::<QaRequest>(body).unwrap().top_k();
        assert_eq!(parse(r#"{"question":"q"}"#), 5);
        assert_eq!(parse(r#"{"question":"q","top_k":0}"#), 5);
        assert_eq!(parse(r#"{"question":"q","top_k":-3}"#), 5);
        assert_eq!(parse(r#"{"question":"q","top_k":null}"#), 5);
        assert_eq!(parse(r#"{"question":"q","top_k":12}"#), 12);
    }
}
