//! Error types for Ragline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing request fields. Never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Embedding/generation backend unreachable or timed out at the transport level.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected the requested model name.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// The generation backend answered but the answer could not be used.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Vector index absent or unreachable. Retrieval falls back to the store.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The operation needs chunks the document does not have.
    #[error("No content: {0}")]
    NoContent(String),

    #[error("Store failure: {0}")]
    StoreFailure(String),

    /// The per-request deadline elapsed before the work completed.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short client-facing reason. Never includes the internal detail string.
    pub fn public_reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid request",
            Self::BackendUnavailable(_) => "backend unavailable",
            Self::InvalidModel(_) => "model rejected by backend",
            Self::GenerationFailed(_) => "generation failed",
            Self::IndexUnavailable(_) => "index unavailable",
            Self::NoContent(_) => "document has no ingested chunks",
            Self::Timeout(_) => "request timed out",
            Self::StoreFailure(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) => {
                "internal error"
            }
        }
    }

    /// Whether the failure was caused by the caller rather than by a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::NoContent(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_reason_hides_detail() {
        let err = Error::StoreFailure("disk I/O error at /var/lib/secret.db".into());
        assert_eq!(err.public_reason(), "internal error");
        assert!(!err.public_reason().contains("secret"));
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::InvalidRequest("x".into()).is_client_error());
        assert!(Error::NoContent("x".into()).is_client_error());
        assert!(!Error::BackendUnavailable("x".into()).is_client_error());
        assert!(!Error::Timeout(std::time::Duration::from_secs(1)).is_client_error());
    }
}
