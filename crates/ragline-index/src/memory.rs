//! In-process exact cosine index.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::{check_top_k, VectorIndex};
use ragline_core::Result;
use ragline_store::embedding::{cosine_similarity, rank_order};

/// Brute-force index held in memory. Lost on restart; the server rebuilds it
/// from the store at startup.
#[derive(Default)]
pub struct MemoryIndex {
    vectors: RwLock<BTreeMap<i64, Vec<f32>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.vectors.read().contains_key(&id)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add_vectors(&self, items: &[(i64, Vec<f32>)]) -> Result<()> {
        let mut vectors = self.vectors.write();
        for (id, vector) in items {
            vectors.insert(*id, vector.clone());
        }
        debug!("Memory index now holds {} vectors", vectors.len());
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(i64, f32)>> {
        check_top_k(top_k)?;
        let vectors = self.vectors.read();
        let mut hits: Vec<(i64, f32)> = vectors
            .iter()
            .map(|(id, v)| (*id, cosine_similarity(query, v)))
            .collect();
        hits.sort_by(|a, b| rank_order(*a, *b));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::Error;

    #[tokio::test]
    async fn test_search_ranks_and_breaks_ties() {
        let index = MemoryIndex::new();
        index
            .add_vectors(&[
                (5, vec![1.0, 0.0]),
                (2, vec![1.0, 0.0]),
                (9, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.0).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert!(hits[0].1 > hits[2].1);
    }

    #[tokio::test]
    async fn test_top_k_larger_than_index() {
        let index = MemoryIndex::new();
        index.add_vectors(&[(1, vec![1.0, 1.0])]).await.unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let index = MemoryIndex::new();
        let err = index.search(&[1.0], 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_readd_replaces_vector() {
        let index = MemoryIndex::new();
        index.add_vectors(&[(1, vec![1.0, 0.0])]).await.unwrap();
        index.add_vectors(&[(1, vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.search(&[0.0, 1.0], 1).await.unwrap();
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }
}
