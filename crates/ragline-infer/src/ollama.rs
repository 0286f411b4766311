//! Ollama HTTP client: `/api/embed` for embeddings, `/api/generate` for text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedder::{resolve_model, EmbeddingGateway};
use crate::generator::{Generation, GenerationRequest, Generator};
use ragline_core::{Error, Result};

/// Long-lived client shared by every request. Per-call deadlines come from
/// the caller; dropping the returned future aborts the HTTP request.
pub struct OllamaClient {
    client: Client,
    host: String,
    generation_model: String,
}

#[derive(Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    prompt_eval_count: Option<i64>,
    eval_count: Option<i64>,
}

impl OllamaClient {
    pub fn new(host: &str, generation_model: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            generation_model: generation_model.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }
}

/// Map a non-success backend status to the error taxonomy.
///
/// A 404 mentioning the model means the model name was rejected. Server
/// errors mean the backend is unavailable. Anything else is reported with
/// `otherwise`.
fn classify_status(
    status: StatusCode,
    body: &str,
    model: &str,
    otherwise: fn(String) -> Error,
) -> Error {
    let detail = format!("backend returned {}: {}", status, body.trim());
    if status == StatusCode::NOT_FOUND && body.to_lowercase().contains("not found") {
        Error::InvalidModel(format!("{} ({})", model, detail))
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Error::BackendUnavailable(detail)
    } else {
        otherwise(detail)
    }
}

/// Keep at most one vector per input; extra vectors are a backend defect.
fn align_to_inputs(mut vectors: Vec<Vec<f32>>, inputs: usize) -> Vec<Vec<f32>> {
    if vectors.len() > inputs {
        warn!(
            "Embedding backend returned {} vectors for {} inputs, discarding the excess",
            vectors.len(),
            inputs
        );
        vectors.truncate(inputs);
    }
    vectors
}

#[async_trait]
impl EmbeddingGateway for OllamaClient {
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = resolve_model(model);
        debug!("Embedding {} texts with {}", texts.len(), model);

        let response = self
            .client
            .post(self.url("/api/embed"))
            .json(&EmbedBody { model, input: texts })
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("embed request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body, model, Error::BackendUnavailable));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("malformed embed response: {}", e)))?;
        Ok(align_to_inputs(parsed.embeddings, texts.len()))
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        debug!(
            "Generating with {} (prompt {} chars, json={})",
            self.generation_model,
            request.prompt.len(),
            request.json_output
        );

        let body = GenerateBody {
            model: &self.generation_model,
            prompt: &request.prompt,
            stream: false,
            format: request.json_output.then_some("json"),
        };

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("generate request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(
                status,
                &body,
                &self.generation_model,
                Error::GenerationFailed,
            ));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::GenerationFailed(format!("malformed generate response: {}", e)))?;

        Ok(Generation {
            text: parsed.response,
            model: self.generation_model.clone(),
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
        })
    }

    fn model(&self) -> &str {
        &self.generation_model
    }
}
