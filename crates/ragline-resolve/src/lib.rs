//! Ragline Resolve — chunk retrieval for grounding.
//!
//! The vector index is tried first when configured; the document store's
//! own cosine search answers whenever the index is unavailable or yields
//! nothing for the requested scope.

pub mod retriever;
pub mod scope;
pub mod types;

pub use retriever::Retriever;
pub use scope::{parse_scope, ScopedQuestion};
pub use types::*;
