//! Embedding gateway trait.

use async_trait::async_trait;
use ragline_core::config::DEFAULT_EMBEDDING_MODEL;
use ragline_core::Result;

/// Converts text batches into fixed-width vectors.
///
/// Output is order-preserving with one vector per input, or a strictly
/// shorter list when the backend only partially succeeded. Callers must
/// match vectors to inputs by position. No caching: every call reaches the
/// backend.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Embed `texts` with `model` (empty means the default model).
    ///
    /// Fails with `BackendUnavailable` on transport errors and `InvalidModel`
    /// when the backend rejects the model name.
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Substitute the default embedding model for an empty name.
pub fn resolve_model(model: &str) -> &str {
    if model.trim().is_empty() {
        DEFAULT_EMBEDDING_MODEL
    } else {
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model() {
        assert_eq!(resolve_model(""), "nomic-embed-text");
        assert_eq!(resolve_model("  "), "nomic-embed-text");
        assert_eq!(resolve_model("bge-m3"), "bge-m3");
    }
}
