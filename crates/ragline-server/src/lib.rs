//! Ragline HTTP server: ingestion, grounded QA and summaries over a shared store.

pub mod indexing;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
