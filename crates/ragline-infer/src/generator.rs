//! Text generation backend trait.

use async_trait::async_trait;
use ragline_core::Result;
use serde::{Deserialize, Serialize};

/// A single-turn generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Ask the backend to constrain output to JSON.
    pub json_output: bool,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_output: false,
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_output: true,
        }
    }
}

/// Generated text plus token accounting when the backend reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub model: String,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate text for a prompt.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;

    /// Model name used for generation.
    fn model(&self) -> &str;
}
