//! Grounded answering and document summarization.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::bullets::extract_bullets;
use crate::prompts::{qa_prompt, summary_prompt};
use crate::types::*;
use ragline_core::{Error, Result};
use ragline_infer::{EmbeddingGateway, GenerationRequest, Generator};
use ragline_resolve::{parse_scope, Retriever};
use ragline_store::DocumentStore;

/// Returned without calling the generator when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "No relevant context was found to answer this question.";

const DEFAULT_SECTION_TITLE: &str = "Summary";

pub struct Synthesizer {
    store: Arc<DocumentStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    generator: Arc<dyn Generator>,
    retriever: Retriever,
    embed_model: String,
    summary_window: usize,
}

impl Synthesizer {
    pub fn new(
        store: Arc<DocumentStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Arc<dyn Generator>,
        retriever: Retriever,
        embed_model: impl Into<String>,
        summary_window: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            retriever,
            embed_model: embed_model.into(),
            summary_window: summary_window.max(1),
        }
    }

    /// Answer `question` from the `top_k` best chunks.
    ///
    /// A leading `[doc:<id>]` marker restricts retrieval to that document.
    pub async fn answer(&self, question: &str, top_k: usize) -> Result<Answer> {
        let scoped = parse_scope(question);
        if scoped.question.is_empty() {
            return Err(Error::InvalidRequest("question is required".into()));
        }

        let query = self.embed_one(&scoped.question).await?;
        let retrieval = self
            .retriever
            .retrieve(&query, top_k, scoped.scope.as_deref())
            .await?;
        debug!(
            "Retrieved {} chunks via {:?} (scope {:?})",
            retrieval.hits.len(),
            retrieval.path,
            scoped.scope
        );

        if retrieval.hits.is_empty() {
            return Ok(Answer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                citations: Vec::new(),
                usage: TokenUsage::default(),
            });
        }

        let prompt = qa_prompt(&scoped.question, &retrieval.hits);
        let generation = self
            .generator
            .generate(&GenerationRequest::text(prompt))
            .await?;

        Ok(Answer {
            answer: generation.text.trim().to_string(),
            citations: retrieval.hits,
            usage: TokenUsage {
                prompt_tokens: generation.prompt_tokens,
                completion_tokens: generation.completion_tokens,
            },
        })
    }

    /// Summarize the most recent chunks of a document into at most `num_bullets` bullets.
    ///
    /// Fails with [`Error::NoContent`] when the document has no chunks.
    pub async fn summarize(
        &self,
        document_id: &str,
        num_bullets: usize,
        category: &str,
        instruction: &str,
    ) -> Result<Summary> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(Error::InvalidRequest("document_id is required".into()));
        }
        if num_bullets == 0 {
            return Err(Error::InvalidRequest("num_bullets must be positive".into()));
        }

        let mut window = self.store.recent_chunks(document_id, self.summary_window)?;
        if window.is_empty() {
            return Err(Error::NoContent(document_id.to_string()));
        }
        window.reverse();
        let text = window
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let category = category.trim();
        let prompt = summary_prompt(&text, num_bullets, category, instruction.trim());

        let started = Instant::now();
        let generation = self
            .generator
            .generate(&GenerationRequest::json(prompt))
            .await?;
        let latency_ms = started.elapsed().as_millis() as i64;

        let (bullets, parser) = extract_bullets(&generation.text, num_bullets);
        info!(
            "Summarized {} ({} chunks) into {} bullets via {} in {}ms",
            document_id,
            window.len(),
            bullets.len(),
            parser,
            latency_ms
        );

        let title = if category.is_empty() {
            DEFAULT_SECTION_TITLE.to_string()
        } else {
            category.to_string()
        };

        Ok(Summary {
            sections: vec![Section { title, bullets }],
            citations: Vec::new(),
            meta: SummaryMeta {
                model: generation.model,
                prompt_tokens: generation.prompt_tokens.unwrap_or(0),
                completion_tokens: generation.completion_tokens.unwrap_or(0),
                latency_ms,
                parser,
            },
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed(&self.embed_model, &[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::BackendUnavailable("no embedding returned for question".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_index::{MemoryIndex, VectorIndex};
    use ragline_infer::stub::{StubEmbedder, StubGenerator};
    use ragline_store::NewChunk;
    use tempfile::TempDir;

    const DIM: usize = 8;

    struct Fixture {
        synth: Synthesizer,
        store: Arc<DocumentStore>,
        generator: Arc<StubGenerator>,
        embedder: Arc<StubEmbedder>,
        _dir: TempDir,
    }

    fn fixture(
        embedder: StubEmbedder,
        generator: StubGenerator,
        index: Option<Arc<dyn VectorIndex>>,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path(), DIM).unwrap());
        let embedder = Arc::new(embedder);
        let generator = Arc::new(generator);
        let synth = Synthesizer::new(
            store.clone(),
            embedder.clone(),
            generator.clone(),
            Retriever::new(store.clone(), index),
            "",
            8,
        );
        Fixture {
            synth,
            store,
            generator,
            embedder,
            _dir: dir,
        }
    }

    fn seed(f: &Fixture, doc: &str, texts: &[&str]) -> Vec<i64> {
        f.store.upsert_document(doc, None).unwrap();
        let chunks: Vec<NewChunk> = texts
            .iter()
            .map(|t| NewChunk::new(*t, Some(f.embedder.vector_for(t))))
            .collect();
        f.store.insert_chunks(doc, &chunks).unwrap()
    }

    #[tokio::test]
    async fn test_answer_cites_retrieved_chunks() {
        let x = |i: usize| {
            let mut v = vec![0.0; DIM];
            v[i] = 1.0;
            v
        };
        let embedder = StubEmbedder::new(DIM)
            .with_vector("revenue", x(0))
            .with_vector("revenue rose sharply", x(0))
            .with_vector("the office moved", x(1));
        let f = fixture(embedder, StubGenerator::new("  Revenue rose [#1].  "), None);
        let ids = seed(&f, "report", &["revenue rose sharply", "the office moved"]);

        let answer = f.synth.answer("revenue", 1).await.unwrap();
        assert_eq!(answer.answer, "Revenue rose [#1].");
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].id, ids[0]);

        let prompt = &f.generator.requests()[0];
        assert!(!prompt.json_output);
        assert!(prompt.prompt.contains(&format!("[#{}] revenue rose sharply", ids[0])));
    }

    #[tokio::test]
    async fn test_answer_is_deterministic() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new("ok"), None);
        seed(&f, "a", &["alpha beta", "beta gamma", "gamma delta", "alpha beta"]);
        seed(&f, "b", &["beta alpha"]);

        let first = f.synth.answer("alpha", 4).await.unwrap();
        let second = f.synth.answer("alpha", 4).await.unwrap();
        let ids = |a: &Answer| a.citations.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_scoped_answer_only_cites_that_document() {
        let index = Arc::new(MemoryIndex::new());
        let f = fixture(
            StubEmbedder::new(DIM),
            StubGenerator::new("ok"),
            Some(index.clone() as Arc<dyn VectorIndex>),
        );
        seed(&f, "a", &["shared words here", "more shared words"]);
        seed(&f, "b", &["shared words here", "shared words again"]);
        index
            .add_vectors(&f.store.pending_index(100).unwrap())
            .await
            .unwrap();

        let answer = f.synth.answer("[doc:b] shared words", 10).await.unwrap();
        assert_eq!(answer.citations.len(), 2);
        assert!(answer.citations.iter().all(|c| c.document_id == "b"));
        // The marker is not part of the prompt question.
        assert!(f.generator.requests()[0].prompt.ends_with("Question: shared words"));
    }

    #[tokio::test]
    async fn test_answer_without_context_skips_generation() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new("should not be used"), None);
        f.store.upsert_document("empty", None).unwrap();

        let answer = f.synth.answer("[doc:empty] anything?", 5).await.unwrap();
        assert!(answer.citations.is_empty());
        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
        assert!(f.generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_answer_rejects_blank_question() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new("x"), None);
        let err = f.synth.answer("[doc:a]   ", 5).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new("").failing("model crashed"), None);
        seed(&f, "a", &["some text"]);
        let err = f.synth.answer("text", 3).await.unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_summary_caps_long_model_output() {
        let reply = (1..=8).map(|i| format!("- finding {}", i)).collect::<Vec<_>>().join("\n");
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new(reply), None);
        seed(&f, "doc", &["first part", "second part"]);

        let summary = f.synth.summarize("doc", 5, "Risks", "").await.unwrap();
        assert_eq!(summary.sections.len(), 1);
        assert_eq!(summary.sections[0].title, "Risks");
        assert_eq!(summary.sections[0].bullets.len(), 5);
        assert!(summary.citations.is_empty());
        assert_eq!(summary.meta.parser, "lines");
        assert_eq!(summary.meta.model, "stub-model");
    }

    #[tokio::test]
    async fn test_summary_keeps_short_model_output_short() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new(r#"{"bullets":["one","two"]}"#), None);
        seed(&f, "doc", &["content"]);

        let summary = f.synth.summarize("doc", 5, "", "").await.unwrap();
        assert_eq!(summary.sections[0].bullets, vec!["one", "two"]);
        assert_eq!(summary.sections[0].title, "Summary");
        assert_eq!(summary.meta.parser, "json");
        assert!(f.generator.requests()[0].json_output);
    }

    #[tokio::test]
    async fn test_summary_window_is_recent_and_in_reading_order() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new("- ok"), None);
        let texts: Vec<String> = (1..=10).map(|i| format!("part {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        seed(&f, "doc", &refs);

        f.synth.summarize("doc", 3, "", "").await.unwrap();
        let prompt = &f.generator.requests()[0].prompt;
        assert!(!prompt.contains("part 2\n"));
        assert!(prompt.ends_with(
            "part 3\n\npart 4\n\npart 5\n\npart 6\n\npart 7\n\npart 8\n\npart 9\n\npart 10"
        ));
    }

    #[tokio::test]
    async fn test_summary_of_empty_document_is_no_content() {
        let f = fixture(StubEmbedder::new(DIM), StubGenerator::new("- x"), None);
        f.store.upsert_document("empty", None).unwrap();

        let err = f.synth.summarize("empty", 5, "", "").await.unwrap_err();
        assert!(matches!(err, Error::NoContent(_)));
        let err = f.synth.summarize("never-ingested", 5, "", "").await.unwrap_err();
        assert!(matches!(err, Error::NoContent(_)));
        assert!(f.generator.requests().is_empty());
    }
}
