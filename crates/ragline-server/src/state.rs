//! Shared application state.

use std::sync::Arc;

use tracing::info;

use ragline_chat::Synthesizer;
use ragline_core::{IndexBackend, RaglineConfig, Result};
use ragline_index::{HttpIndex, MemoryIndex, VectorIndex};
use ragline_infer::{EmbeddingGateway, Generator};
use ragline_ingest::Ingester;
use ragline_resolve::Retriever;
use ragline_store::DocumentStore;

/// Shared application state accessible from all route handlers.
///
/// Every handle is constructed once at startup and shared read-only across
/// requests.
pub struct AppState {
    pub config: RaglineConfig,
    pub store: Arc<DocumentStore>,
    pub index: Option<Arc<dyn VectorIndex>>,
    pub ingester: Ingester,
    pub synthesizer: Synthesizer,
}

impl AppState {
    pub fn new(
        config: RaglineConfig,
        store: Arc<DocumentStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Arc<dyn Generator>,
        index: Option<Arc<dyn VectorIndex>>,
    ) -> Self {
        let embed_model = config.backend.embedding_model.clone();
        let ingester = Ingester::new(
            store.clone(),
            embedder.clone(),
            index.clone(),
            embed_model.clone(),
        );
        let synthesizer = Synthesizer::new(
            store.clone(),
            embedder,
            generator,
            Retriever::new(store.clone(), index.clone()),
            embed_model,
            config.summary_window,
        );
        Self {
            config,
            store,
            index,
            ingester,
            synthesizer,
        }
    }

    /// Whether the index starts empty on every boot and must be rebuilt from the store.
    pub fn index_is_ephemeral(&self) -> bool {
        self.config.index == IndexBackend::Memory
    }
}

/// Build the configured vector index, if any.
pub fn connect_index(backend: &IndexBackend) -> Result<Option<Arc<dyn VectorIndex>>> {
    let index: Option<Arc<dyn VectorIndex>> = match backend {
        IndexBackend::Disabled => None,
        IndexBackend::Memory => Some(Arc::new(MemoryIndex::new())),
        IndexBackend::Http(host) => Some(Arc::new(HttpIndex::new(host)?)),
    };
    match &index {
        Some(i) => info!("Vector index: {}", i.name()),
        None => info!("Vector index disabled, retrieval uses the store"),
    }
    Ok(index)
}
