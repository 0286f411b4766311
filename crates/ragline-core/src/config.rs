//! Configuration loaded from environment variables with defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_GENERATION_MODEL: &str = "qwen2.5:3b";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_EMBEDDING_DIM: usize = 768;
pub const DEFAULT_SUMMARY_WINDOW: usize = 8;

/// Where chunk vectors are registered besides the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "host")]
pub enum IndexBackend {
    /// No separate index; retrieval always uses the store path.
    Disabled,
    /// In-process exact index, rebuilt from the store at startup.
    Memory,
    /// External index service reachable at the given base URL.
    Http(String),
}

/// Embedding/generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub generation_model: String,
    pub embedding_model: String,
}

/// Per-request wall-clock budgets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    pub ingest: Duration,
    pub query: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            ingest: Duration::from_secs(120),
            query: Duration::from_secs(60),
        }
    }
}

/// Top-level Ragline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaglineConfig {
    /// HTTP server port.
    pub port: u16,
    /// Directory holding `ragline.db`.
    pub data_dir: PathBuf,
    pub backend: BackendConfig,
    /// Embedding width. The store column and the backend model must agree.
    pub embedding_dim: usize,
    pub index: IndexBackend,
    pub timeouts: Timeouts,
    /// Interval between index reconciliation passes. `None` disables the worker.
    pub reconcile_interval: Option<Duration>,
    /// Number of most recent chunks fed to Summarize.
    pub summary_window: usize,
}

impl RaglineConfig {
    /// Create configuration from the process environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let data_dir = get("RAGLINE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let backend = BackendConfig {
            host: get("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.into()),
            generation_model: get("MODEL_NAME").unwrap_or_else(|| DEFAULT_GENERATION_MODEL.into()),
            embedding_model: get("EMBED_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
        };

        let embedding_dim = parse_or(get("EMBEDDING_DIM"), "EMBEDDING_DIM", DEFAULT_EMBEDDING_DIM)?;
        if embedding_dim == 0 {
            return Err(Error::Config("EMBEDDING_DIM must be positive".into()));
        }

        let index = match get("FAISS_HOST") {
            None => IndexBackend::Disabled,
            Some(v) if v.eq_ignore_ascii_case("memory") => IndexBackend::Memory,
            Some(v) => IndexBackend::Http(v.trim_end_matches('/').to_string()),
        };

        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            ingest: Duration::from_secs(parse_or(
                get("INGEST_TIMEOUT_SECS"),
                "INGEST_TIMEOUT_SECS",
                defaults.ingest.as_secs(),
            )?),
            query: Duration::from_secs(parse_or(
                get("QUERY_TIMEOUT_SECS"),
                "QUERY_TIMEOUT_SECS",
                defaults.query.as_secs(),
            )?),
        };

        let reconcile_secs: u64 =
            parse_or(get("RECONCILE_INTERVAL_SECS"), "RECONCILE_INTERVAL_SECS", 300)?;
        let reconcile_interval = (reconcile_secs > 0).then(|| Duration::from_secs(reconcile_secs));

        let summary_window =
            parse_or(get("SUMMARY_WINDOW"), "SUMMARY_WINDOW", DEFAULT_SUMMARY_WINDOW)?.max(1);

        Ok(Self {
            port,
            data_dir,
            backend,
            embedding_dim,
            index,
            timeouts,
            reconcile_interval,
            summary_window,
        })
    }

    /// Directory the SQLite database lives in.
    pub fn db_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, v))),
    }
}
