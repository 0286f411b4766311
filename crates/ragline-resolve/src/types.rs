//! Retrieval types.

use ragline_store::ScoredChunk;
use serde::Serialize;

/// Which path produced a retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPath {
    /// Vector index hits, resolved to chunk text through the store.
    Index,
    /// Cosine search inside the document store.
    Store,
}

/// Ranked chunks plus the path that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub hits: Vec<ScoredChunk>,
    pub path: RetrievalPath,
}
