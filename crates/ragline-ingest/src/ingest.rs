//! Ingestion pipeline: document upsert → batch embed → chunk insert → index registration.
//!
//! The store is the source of truth. Index registration is a second step keyed
//! by the store-assigned chunk id; chunks that could not be registered stay
//! `stored` and are picked up by [`Ingester::reconcile`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use ragline_core::{Error, Result};
use ragline_index::VectorIndex;
use ragline_infer::EmbeddingGateway;
use ragline_store::{DocumentStore, NewChunk};

/// Outcome of one ingest call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestResult {
    /// Chunks persisted.
    pub chunks: usize,
    /// Chunks that received an embedding.
    pub embedded: usize,
    /// Chunks registered with the vector index during this call.
    pub indexed: usize,
    /// Non-fatal degradations.
    pub warnings: Vec<String>,
}

/// Handles document ingestion against shared store, gateway and index handles.
pub struct Ingester {
    store: Arc<DocumentStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    index: Option<Arc<dyn VectorIndex>>,
    embed_model: String,
}

impl Ingester {
    pub fn new(
        store: Arc<DocumentStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        index: Option<Arc<dyn VectorIndex>>,
        embed_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            embed_model: embed_model.into(),
        }
    }

    /// Ingest pre-split chunk texts for `document_id`, in order.
    ///
    /// Blank entries are skipped. Fails with [`Error::InvalidRequest`] before
    /// any write if the id is blank or no entry has content.
    pub async fn ingest(
        &self,
        document_id: &str,
        title: Option<&str>,
        chunk_texts: &[String],
    ) -> Result<IngestResult> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(Error::InvalidRequest("document_id is required".into()));
        }
        let texts: Vec<String> = chunk_texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        if texts.is_empty() {
            return Err(Error::InvalidRequest(
                "chunks must contain at least one non-empty entry".into(),
            ));
        }

        let mut result = IngestResult::default();
        if texts.len() < chunk_texts.len() {
            result.warnings.push(format!(
                "skipped {} blank chunk(s)",
                chunk_texts.len() - texts.len()
            ));
        }

        self.store.upsert_document(document_id, title)?;

        let vectors = self.embedder.embed(&self.embed_model, &texts).await?;
        if vectors.len() < texts.len() {
            let msg = format!(
                "embedding backend returned {} vectors for {} chunks; the rest are stored without embeddings",
                vectors.len(),
                texts.len()
            );
            warn!("{}", msg);
            result.warnings.push(msg);
        }

        let dim = self.store.embedding_dim();
        let mut vectors = vectors.into_iter();
        let new_chunks: Vec<NewChunk> = texts
            .into_iter()
            .map(|text| {
                let embedding = vectors.next().filter(|v| {
                    if v.len() == dim {
                        true
                    } else {
                        warn!("Discarding {}-wide vector, store expects {}", v.len(), dim);
                        false
                    }
                });
                NewChunk::new(text, embedding)
            })
            .collect();

        let ids = self.store.insert_chunks(document_id, &new_chunks)?;
        result.chunks = ids.len();

        let items: Vec<(i64, Vec<f32>)> = ids
            .iter()
            .zip(new_chunks)
            .filter_map(|(id, chunk)| chunk.embedding.map(|v| (*id, v)))
            .collect();
        result.embedded = items.len();

        if let Some(index) = &self.index {
            match self.register(index.as_ref(), &items).await {
                Ok(n) => result.indexed = n,
                Err(e) => {
                    let msg = format!("index registration failed, chunks remain stored: {}", e);
                    warn!("{}", msg);
                    result.warnings.push(msg);
                }
            }
        }

        info!(
            "Ingested document {}: {} chunks ({} embedded, {} indexed)",
            document_id, result.chunks, result.embedded, result.indexed
        );
        Ok(result)
    }

    /// Register already-embedded chunks that are still `stored`, without re-embedding.
    ///
    /// Returns the number of chunks newly marked `indexed`. A no-op when no
    /// index is configured.
    pub async fn reconcile(&self, limit: usize) -> Result<usize> {
        let Some(index) = &self.index else {
            return Ok(0);
        };
        let pending = self.store.pending_index(limit)?;
        if pending.is_empty() {
            debug!("Reconcile: nothing pending");
            return Ok(0);
        }
        let n = self.register(index.as_ref(), &pending).await?;
        info!("Reconciled {} chunks into the {} index", n, index.name());
        Ok(n)
    }

    async fn register(&self, index: &dyn VectorIndex, items: &[(i64, Vec<f32>)]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        index.add_vectors(items).await?;
        let ids: Vec<i64> = items.iter().map(|(id, _)| *id).collect();
        self.store.mark_indexed(&ids)
    }
}
