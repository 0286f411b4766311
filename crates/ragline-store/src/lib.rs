//! Ragline Store — SQLite documents and chunks with nullable embeddings.

pub mod embedding;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::DocumentStore;
pub use types::*;
