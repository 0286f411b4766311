//! HTTP route handlers.

pub mod error;
pub mod ingest;
pub mod qa;
pub mod stats;
pub mod summarize;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;
use ragline_store::AuditEntry;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(stats::routes())
        .merge(ingest::routes())
        .merge(qa::routes())
        .merge(summarize::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Append a row to the audit trail. Failures are logged, never surfaced.
pub(crate) fn record_audit(
    state: &AppState,
    endpoint: &str,
    started: Instant,
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
) {
    let entry = AuditEntry {
        endpoint: endpoint.to_string(),
        latency_ms: started.elapsed().as_millis() as i64,
        prompt_tokens,
        completion_tokens,
    };
    if let Err(e) = state.store.record_audit(&entry) {
        warn!("Failed to record audit for {}: {}", endpoint, e);
    }
}
