//! Ragline Core — error taxonomy, configuration, request deadlines.

pub mod config;
pub mod deadline;
pub mod error;

pub use config::{BackendConfig, IndexBackend, RaglineConfig, Timeouts};
pub use deadline::with_deadline;
pub use error::{Error, Result};
