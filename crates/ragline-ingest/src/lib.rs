//! Ragline Ingest — document ingestion and vector index reconciliation.

pub mod ingest;

pub use ingest::{IngestResult, Ingester};
