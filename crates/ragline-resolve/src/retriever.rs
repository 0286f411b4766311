//! Index-first retrieval with store fallback.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::types::{Retrieval, RetrievalPath};
use ragline_core::{Error, Result};
use ragline_index::VectorIndex;
use ragline_store::{DocumentStore, ScoredChunk};

/// Index hits requested per wanted result when a scope filter follows the search.
const SCOPED_OVERFETCH: usize = 4;

pub struct Retriever {
    store: Arc<DocumentStore>,
    index: Option<Arc<dyn VectorIndex>>,
}

impl Retriever {
    pub fn new(store: Arc<DocumentStore>, index: Option<Arc<dyn VectorIndex>>) -> Self {
        Self { store, index }
    }

    /// Rank chunks against `query`, optionally restricted to one document.
    ///
    /// The index answers when it can fill the request; otherwise the store
    /// scan does, so the result does not depend on whether an index is
    /// configured.
    ///
    /// Returns at most `top_k` hits, ordered by descending score then
    /// ascending chunk id. No embedded chunks in scope is an empty result,
    /// not an error.
    pub async fn retrieve(
        &self,
        query: &[f32],
        top_k: usize,
        scope: Option<&str>,
    ) -> Result<Retrieval> {
        if top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be positive".into()));
        }

        if let Some(index) = &self.index {
            match self.search_index(index.as_ref(), query, top_k, scope).await {
                Ok(Some(hits)) if !hits.is_empty() => {
                    debug!("Index {} answered with {} hits", index.name(), hits.len());
                    return Ok(Retrieval {
                        hits,
                        path: RetrievalPath::Index,
                    });
                }
                Ok(Some(_)) => debug!("Index {} had no hits in scope, using store", index.name()),
                Ok(None) => debug!(
                    "Index {} window filled by other chunks, using store",
                    index.name()
                ),
                Err(e) => warn!("Index {} not queryable, using store: {}", index.name(), e),
            }
        }

        let hits = self.store.similar_chunks(query, top_k, scope)?;
        Ok(Retrieval {
            hits,
            path: RetrievalPath::Store,
        })
    }

    async fn search_index(
        &self,
        index: &dyn VectorIndex,
        query: &[f32],
        top_k: usize,
        scope: Option<&str>,
    ) -> Result<Option<Vec<ScoredChunk>>> {
        let fetch = match scope {
            Some(_) => top_k.saturating_mul(SCOPED_OVERFETCH),
            None => top_k,
        };
        let ranked = index.search(query, fetch).await?;
        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();

        // Ids whose chunk was deleted from the store resolve to nothing and drop out.
        let chunks = self.store.get_chunks_by_ids(&ids)?;
        let mut hits: Vec<ScoredChunk> = chunks
            .into_iter()
            .filter(|c| scope.map_or(true, |doc| c.document_id == doc))
            .filter_map(|c| {
                let score = ranked.iter().find(|(id, _)| *id == c.id)?.1;
                Some(ScoredChunk {
                    id: c.id,
                    document_id: c.document_id,
                    content: c.content,
                    score,
                })
            })
            .collect();

        // A short result from a full window means the filter discarded hits the
        // index could have replaced; only the store can answer exactly.
        if hits.len() < top_k && ranked.len() == fetch {
            return Ok(None);
        }
        hits.truncate(top_k);
        Ok(Some(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragline_index::MemoryIndex;
    use ragline_store::NewChunk;
    use tempfile::TempDir;

    struct DownIndex;

    #[async_trait]
    impl VectorIndex for DownIndex {
        async fn add_vectors(&self, _items: &[(i64, Vec<f32>)]) -> Result<()> {
            Err(Error::IndexUnavailable("down".into()))
        }
        async fn search(&self, _query: &[f32], _top_k: usize) -> Result<Vec<(i64, f32)>> {
            Err(Error::IndexUnavailable("down".into()))
        }
        fn name(&self) -> &str {
            "down"
        }
    }

    /// Two documents: `a` has chunks along x, `b` along y.
    fn seeded_store() -> (Arc<DocumentStore>, Vec<i64>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path(), 2).unwrap());
        store.upsert_document("a", None).unwrap();
        store.upsert_document("b", None).unwrap();
        let mut ids = store
            .insert_chunks(
                "a",
                &[
                    NewChunk::new("a-x", Some(vec![1.0, 0.0])),
                    NewChunk::new("a-xy", Some(vec![1.0, 1.0])),
                ],
            )
            .unwrap();
        ids.extend(
            store
                .insert_chunks(
                    "b",
                    &[
                        NewChunk::new("b-y", Some(vec![0.0, 1.0])),
                        NewChunk::new("b-x", Some(vec![1.0, 0.0])),
                    ],
                )
                .unwrap(),
        );
        (store, ids, dir)
    }

    async fn indexed(store: &DocumentStore) -> Arc<dyn VectorIndex> {
        let index = MemoryIndex::new();
        index.add_vectors(&store.pending_index(100).unwrap()).await.unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_store_path_ranks_with_id_tiebreak() {
        let (store, ids, _dir) = seeded_store();
        let retriever = Retriever::new(store, None);
        let result = retriever.retrieve(&[1.0, 0.0], 3, None).await.unwrap();
        assert_eq!(result.path, RetrievalPath::Store);
        let got: Vec<i64> = result.hits.iter().map(|h| h.id).collect();
        // a-x and b-x tie at 1.0; lower id first.
        assert_eq!(got, vec![ids[0], ids[3], ids[1]]);
    }

    #[tokio::test]
    async fn test_index_path_maps_ids_to_content() {
        let (store, ids, _dir) = seeded_store();
        let index = indexed(&store).await;
        let retriever = Retriever::new(store, Some(index));
        let result = retriever.retrieve(&[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(result.path, RetrievalPath::Index);
        assert_eq!(result.hits[0].id, ids[2]);
        assert_eq!(result.hits[0].content, "b-y");
        assert_eq!(result.hits[0].document_id, "b");
    }

    #[tokio::test]
    async fn test_scope_is_respected_on_both_paths() {
        let (store, _ids, _dir) = seeded_store();
        let index = indexed(&store).await;
        for retriever in [
            Retriever::new(store.clone(), None),
            Retriever::new(store.clone(), Some(index.clone())),
        ] {
            let result = retriever.retrieve(&[0.0, 1.0], 5, Some("a")).await.unwrap();
            assert_eq!(result.hits.len(), 2);
            assert!(result.hits.iter().all(|h| h.document_id == "a"));
        }
    }

    #[tokio::test]
    async fn test_unavailable_index_falls_back_to_store() {
        let (store, _ids, _dir) = seeded_store();
        let retriever = Retriever::new(store, Some(Arc::new(DownIndex)));
        let result = retriever.retrieve(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(result.path, RetrievalPath::Store);
        assert_eq!(result.hits.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_falls_back_to_store() {
        let (store, _ids, _dir) = seeded_store();
        let retriever = Retriever::new(store, Some(Arc::new(MemoryIndex::new())));
        let result = retriever.retrieve(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(result.path, RetrievalPath::Store);
        assert!(!result.hits.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_chunks_drop_out_of_index_hits() {
        let (store, _ids, _dir) = seeded_store();
        let index = indexed(&store).await;
        assert!(store.delete_document("b").unwrap());
        let retriever = Retriever::new(store, Some(index));
        let result = retriever.retrieve(&[0.0, 1.0], 5, None).await.unwrap();
        assert_eq!(result.path, RetrievalPath::Index);
        assert!(result.hits.iter().all(|h| h.document_id == "a"));
    }

    #[tokio::test]
    async fn test_deletions_filling_the_window_use_store() {
        let (store, ids, _dir) = seeded_store();
        let index = indexed(&store).await;
        assert!(store.delete_document("b").unwrap());
        let retriever = Retriever::new(store, Some(index));
        // Top two index hits for y are b-y (deleted) and a-xy.
        let result = retriever.retrieve(&[0.0, 1.0], 2, None).await.unwrap();
        assert_eq!(result.path, RetrievalPath::Store);
        let got: Vec<i64> = result.hits.iter().map(|h| h.id).collect();
        assert_eq!(got, vec![ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn test_scoped_search_not_crowded_out_by_other_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path(), 2).unwrap());
        store.upsert_document("a", None).unwrap();
        store.upsert_document("b", None).unwrap();
        store
            .insert_chunks(
                "a",
                &[
                    NewChunk::new("a-near", Some(vec![1.0, 0.0])),
                    NewChunk::new("a-far", Some(vec![0.0, 1.0])),
                ],
            )
            .unwrap();
        let crowd: Vec<NewChunk> = (0..8)
            .map(|i| NewChunk::new(format!("b-{}", i), Some(vec![1.0, 0.1])))
            .collect();
        store.insert_chunks("b", &crowd).unwrap();
        let index = indexed(&store).await;

        let with_index = Retriever::new(store.clone(), Some(index))
            .retrieve(&[1.0, 0.0], 2, Some("a"))
            .await
            .unwrap();
        let store_only = Retriever::new(store, None)
            .retrieve(&[1.0, 0.0], 2, Some("a"))
            .await
            .unwrap();

        let contents = |r: &Retrieval| -> Vec<String> {
            r.hits.iter().map(|h| h.content.clone()).collect()
        };
        assert_eq!(contents(&with_index), vec!["a-near", "a-far"]);
        assert_eq!(contents(&with_index), contents(&store_only));
    }

    #[tokio::test]
    async fn test_unknown_scope_is_empty_not_error() {
        let (store, _ids, _dir) = seeded_store();
        let index = indexed(&store).await;
        let retriever = Retriever::new(store, Some(index));
        let result = retriever.retrieve(&[1.0, 0.0], 3, Some("missing")).await.unwrap();
        assert!(result.hits.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_larger_than_corpus() {
        let (store, _ids, _dir) = seeded_store();
        let retriever = Retriever::new(store, None);
        let result = retriever.retrieve(&[1.0, 1.0], 50, None).await.unwrap();
        assert_eq!(result.hits.len(), 4);
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let (store, _ids, _dir) = seeded_store();
        let retriever = Retriever::new(store, None);
        let err = retriever.retrieve(&[1.0, 0.0], 0, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
