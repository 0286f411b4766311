//! Ragline Index — nearest-neighbor search over chunk vectors.
//!
//! Entries are keyed by the chunk id assigned by the document store, so a
//! search hit maps back to its chunk without any side table.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use ragline_core::{Error, Result};

pub use http::HttpIndex;
pub use memory::MemoryIndex;

/// A vector index keyed by chunk id.
///
/// Implementations must report an unreachable backend as
/// [`Error::IndexUnavailable`], never as an empty result.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Register `(chunk_id, vector)` pairs. Re-adding an id replaces its vector.
    async fn add_vectors(&self, items: &[(i64, Vec<f32>)]) -> Result<()>;

    /// Top-k ids by descending similarity, ties broken by ascending id.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(i64, f32)>>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

pub(crate) fn check_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(Error::InvalidRequest("top_k must be positive".into()));
    }
    Ok(())
}
