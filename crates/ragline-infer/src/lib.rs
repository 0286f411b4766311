//! Ragline Infer — embedding gateway and text generation backend.
//!
//! Both are consumed as opaque services through the [`EmbeddingGateway`] and
//! [`Generator`] traits. [`OllamaClient`] implements both over HTTP; the
//! [`stub`] module provides deterministic in-process doubles.

pub mod embedder;
pub mod generator;
pub mod ollama;
pub mod stub;

pub use embedder::{resolve_model, EmbeddingGateway};
pub use generator::{Generation, GenerationRequest, Generator};
pub use ollama::OllamaClient;
