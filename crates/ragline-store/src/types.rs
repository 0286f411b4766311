//! Data types for documents, chunks, and retrieval hits.

use serde::{Deserialize, Serialize};

/// A document row from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Whether a chunk's vector has been registered with the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    /// Durable in the store, not (yet) searchable through the index.
    Stored,
    /// Registered with the vector index.
    Indexed,
}

impl IndexStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "indexed" => Self::Indexed,
            _ => Self::Stored,
        }
    }
}

/// A chunk row from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    pub content: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub index_status: IndexStatus,
    pub created_at: i64,
}

/// A chunk to insert. Ids are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewChunk {
    pub page: Option<i64>,
    pub span: Option<String>,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

impl NewChunk {
    pub fn new(content: impl Into<String>, embedding: Option<Vec<f32>>) -> Self {
        Self {
            content: content.into(),
            embedding,
            ..Default::default()
        }
    }
}

/// A ranked retrieval hit. Also the citation shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: i64,
    pub document_id: String,
    pub content: String,
    pub score: f32,
}

/// One row of the request audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditEntry {
    pub endpoint: String,
    pub latency_ms: i64,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
    pub indexed_chunks: i64,
    pub embedding_dim: usize,
}
