//! Client for an external vector index service.
//!
//! Wire format:
//! - `POST {host}/add` with `{"items": [{"id": 1, "vector": [...]}]}`
//! - `POST {host}/search` with `{"vector": [...], "top_k": 5}`, answered by
//!   `{"results": [{"id": 1, "score": 0.93}]}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{check_top_k, VectorIndex};
use ragline_core::{Error, Result};
use ragline_store::embedding::rank_order;

pub struct HttpIndex {
    client: Client,
    host: String,
}

#[derive(Serialize)]
struct AddItem<'a> {
    id: i64,
    vector: &'a [f32],
}

#[derive(Serialize)]
struct AddBody<'a> {
    items: Vec<AddItem<'a>>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchHit {
    id: i64,
    score: f32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl HttpIndex {
    pub fn new(host: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(format!("{} request failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::IndexUnavailable(format!(
                "{} returned {}: {}",
                path,
                status,
                body.trim()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for HttpIndex {
    async fn add_vectors(&self, items: &[(i64, Vec<f32>)]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let body = AddBody {
            items: items
                .iter()
                .map(|(id, v)| AddItem { id: *id, vector: v })
                .collect(),
        };
        self.post("/add", &body).await?;
        debug!("Registered {} vectors with {}", items.len(), self.host);
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(i64, f32)>> {
        check_top_k(top_k)?;
        let response = self
            .post("/search", &SearchBody { vector: query, top_k })
            .await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::IndexUnavailable(format!("malformed search response: {}", e)))?;
        Ok(normalize_hits(parsed.results, top_k))
    }

    fn name(&self) -> &str {
        &self.host
    }
}

/// Re-sort the service's hits so tie order does not depend on the backend.
fn normalize_hits(results: Vec<SearchHit>, top_k: usize) -> Vec<(i64, f32)> {
    let mut hits: Vec<(i64, f32)> = results.into_iter().map(|h| (h.id, h.score)).collect();
    hits.sort_by(|a, b| rank_order(*a, *b));
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_body_shape() {
        let v = vec![0.5f32, 1.0];
        let body = AddBody {
            items: vec![AddItem { id: 3, vector: &v }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["items"][0]["id"], 3);
        assert_eq!(json["items"][0]["vector"][1], 1.0);
    }

    #[test]
    fn test_normalize_hits_orders_ties() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"results":[{"id":8,"score":0.5},{"id":4,"score":0.9},{"id":2,"score":0.5}]}"#,
        )
        .unwrap();
        assert_eq!(
            normalize_hits(parsed.results, 2),
            vec![(4, 0.9), (2, 0.5)]
        );
    }

    #[tokio::test]
    async fn test_unreachable_index_is_unavailable_not_empty() {
        let index = HttpIndex::new("http://127.0.0.1:1").unwrap();
        let err = index.search(&[1.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
        let err = index.add_vectors(&[(1, vec![1.0])]).await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected_before_network() {
        let index = HttpIndex::new("http://127.0.0.1:1").unwrap();
        let err = index.search(&[1.0], 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
