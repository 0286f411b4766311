//! Synthesis response types.

use ragline_store::ScoredChunk;
use serde::Serialize;

/// Token counts reported by the generation backend, when it reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
}

/// A grounded answer and the chunks it was grounded in.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<ScoredChunk>,
    #[serde(skip)]
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryMeta {
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub latency_ms: i64,
    /// Which bullet strategy produced the bullets.
    pub parser: &'static str,
}

/// A document summary. Citations are always empty: the whole window is the source.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub sections: Vec<Section>,
    pub citations: Vec<ScoredChunk>,
    pub meta: SummaryMeta,
}
