//! Deterministic in-process backends for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::embedder::EmbeddingGateway;
use crate::generator::{Generation, GenerationRequest, Generator};
use ragline_core::{Error, Result};

/// Embeds text into a character-bucket vector, with per-text overrides.
pub struct StubEmbedder {
    dim: usize,
    overrides: HashMap<String, Vec<f32>>,
    max_vectors: Option<usize>,
    delay: Option<Duration>,
    failure: Option<String>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            overrides: HashMap::new(),
            max_vectors: None,
            delay: None,
            failure: None,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Return `vector` whenever `text` is embedded.
    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), vector);
        self
    }

    /// Return at most `n` vectors per call, simulating partial backend failure.
    pub fn returning_at_most(mut self, n: usize) -> Self {
        self.max_vectors = Some(n);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `BackendUnavailable`.
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Number of calls started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls that ran to completion (not cancelled).
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Bag-of-characters vector: stable for equal text, similar for similar text.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.overrides.get(text) {
            return v.clone();
        }
        let mut v = vec![0.0f32; self.dim];
        for c in text.chars().filter(|c| c.is_alphanumeric()) {
            for lower in c.to_lowercase() {
                v[lower as usize % self.dim] += 1.0;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingGateway for StubEmbedder {
    async fn embed(&self, _model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(Error::BackendUnavailable(reason.clone()));
        }
        let limit = self.max_vectors.unwrap_or(texts.len()).min(texts.len());
        let vectors = texts[..limit].iter().map(|t| self.vector_for(t)).collect();
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(vectors)
    }
}

/// Replays a fixed reply and records every prompt it receives.
pub struct StubGenerator {
    model: String,
    reply: String,
    delay: Option<Duration>,
    failure: Option<String>,
    prompts: Mutex<Vec<GenerationRequest>>,
    completed: AtomicUsize,
}

impl StubGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            model: "stub-model".into(),
            reply: reply.into(),
            delay: None,
            failure: None,
            prompts: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `GenerationFailed`.
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.prompts.lock().clone()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.prompts.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(Error::GenerationFailed(reason.clone()));
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(Generation {
            text: self.reply.clone(),
            model: self.model.clone(),
            prompt_tokens: Some(request.prompt.split_whitespace().count() as i64),
            completion_tokens: Some(self.reply.split_whitespace().count() as i64),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
