//! Per-request deadlines.
//!
//! The wrapped future is dropped when the budget elapses, which cancels every
//! in-flight downstream call it owns (HTTP requests, sleeps, pending awaits).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{Error, Result};

/// Run `fut` under a wall-clock budget, failing with [`Error::Timeout`] when it elapses.
pub async fn with_deadline<T, F>(budget: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Request exceeded its {:?} deadline, cancelling", budget);
            Err(Error::Timeout(budget))
        }
    }
}
