//! Background index reconciliation.
//!
//! Chunks whose index registration failed at ingest time stay `stored`. This
//! worker re-registers them from their stored vectors on startup and then on
//! a fixed interval.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Chunks registered per index call.
const RECONCILE_BATCH: usize = 256;

/// Start the reconciliation worker. Returns `None` when no index is configured.
pub fn start_reconcile_worker(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    state.index.as_ref()?;

    Some(tokio::spawn(async move {
        if state.index_is_ephemeral() {
            match state.store.reset_index_status() {
                Ok(n) => info!("In-memory index starts empty, rebuilding {} chunks", n),
                Err(e) => error!("Failed to reset index status: {}", e),
            }
        }

        let n = reconcile_all(&state).await;
        info!("Startup reconciliation registered {} chunks", n);

        let Some(every) = state.config.reconcile_interval else {
            return;
        };
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let n = reconcile_all(&state).await;
            if n > 0 {
                info!("Reconciled {} chunks into the index", n);
            }
        }
    }))
}

/// Drain every pending chunk into the index. Stops at the first failure.
pub async fn reconcile_all(state: &AppState) -> usize {
    let mut total = 0;
    loop {
        match state.ingester.reconcile(RECONCILE_BATCH).await {
            Ok(0) => return total,
            Ok(n) => total += n,
            Err(e) => {
                warn!("Index reconciliation paused: {}", e);
                return total;
            }
        }
    }
}
