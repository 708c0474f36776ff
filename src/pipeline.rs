//! The request-handling pipeline.
//!
//! A [`Pipeline`] owns its [`Valves`], the ingested documents and the
//! vector index. The lifecycle is:
//!
//! ```text
//! Pipeline::new(valves) → on_startup() → pipe(..)* → on_shutdown()
//! ```
//!
//! `on_startup` scans the document source and builds the index; any
//! failure there is fatal and leaves the pipeline unable to answer.
//! [`Pipeline::reload`] re-runs ingestion on a live pipeline and swaps the
//! new index in only if the rebuild succeeds.
//!
//! # Error policy of `pipe`
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | empty message | `Err(PipelineError::InvalidQuery)`, no network call |
//! | called before startup | `Err(PipelineError::NotStarted)` |
//! | embedding or model endpoint failure | `Ok(PipeOutput::Text("Error: ..."))` |

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Valves;
use crate::connector_fs::scan_documents;
use crate::embedding::{embed_query, Embedder, OllamaEmbedder};
use crate::error::{PipelineError, Result};
use crate::index::VectorIndex;
use crate::llm::{LanguageModel, ModelError, OllamaClient};
use crate::models::{ChatMessage, Document};
use crate::prompt::{compose_prompt, join_context};
use crate::stream::TokenStream;

/// Result of one `pipe` call.
#[derive(Debug)]
pub enum PipeOutput {
    /// A complete answer, or a rendered endpoint failure.
    Text(String),
    /// Fragments as the model produces them.
    Stream(TokenStream),
}

impl PipeOutput {
    /// Collapse either variant into a single string, draining a stream.
    pub async fn into_text(self) -> String {
        match self {
            PipeOutput::Text(text) => text,
            PipeOutput::Stream(stream) => stream.collect_text().await,
        }
    }
}

struct Loaded {
    documents: Vec<Document>,
    index: VectorIndex,
}

pub struct Pipeline {
    valves: Valves,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
    state: Option<Loaded>,
}

impl Pipeline {
    /// Create a pipeline talking to the Ollama server named in `valves`.
    pub fn new(valves: Valves) -> Result<Self> {
        let embedder = OllamaEmbedder::new(&valves)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        let model =
            OllamaClient::new(&valves).map_err(|e| PipelineError::Configuration(e.to_string()))?;
        Ok(Self::with_backends(valves, Arc::new(embedder), Arc::new(model)))
    }

    /// Create a pipeline with explicit embedding and completion backends.
    pub fn with_backends(
        valves: Valves,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            valves,
            embedder,
            model,
            state: None,
        }
    }

    pub fn valves(&self) -> &Valves {
        &self.valves
    }

    /// True once startup has completed and until shutdown.
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Ingested documents, in scan order. Empty before startup.
    pub fn documents(&self) -> &[Document] {
        self.state
            .as_ref()
            .map(|s| s.documents.as_slice())
            .unwrap_or_default()
    }

    /// Number of indexed chunks. Zero before startup.
    pub fn indexed_chunks(&self) -> usize {
        self.state.as_ref().map(|s| s.index.len()).unwrap_or(0)
    }

    /// Load documents and build the index.
    ///
    /// Any previous state is released first, so a failed startup leaves the
    /// pipeline not ready. Calling this twice rebuilds from scratch.
    pub async fn on_startup(&mut self) -> Result<()> {
        self.state = None;
        let loaded = self.load().await?;
        tracing::info!(
            documents = loaded.documents.len(),
            chunks = loaded.index.len(),
            model = %self.valves.model_name,
            embedding_model = %self.valves.embedding_model_name,
            "pipeline initialized"
        );
        self.state = Some(loaded);
        Ok(())
    }

    /// Re-ingest the document source while keeping the current index until
    /// the new one is complete.
    ///
    /// On failure the pipeline keeps serving from the previous index.
    pub async fn reload(&mut self) -> Result<()> {
        let loaded = self.load().await?;
        tracing::info!(
            documents = loaded.documents.len(),
            chunks = loaded.index.len(),
            "pipeline reloaded"
        );
        self.state = Some(loaded);
        Ok(())
    }

    /// Release documents and index.
    pub async fn on_shutdown(&mut self) {
        tracing::info!("shutting down pipeline");
        self.state = None;
    }

    async fn load(&self) -> Result<Loaded> {
        let path = &self.valves.document_path;
        tracing::info!(path = %path.display(), "loading documents");
        let documents = scan_documents(path, &self.valves.include_globs)?;
        let index =
            VectorIndex::build(&documents, self.embedder.as_ref(), self.valves.max_tokens).await?;
        Ok(Loaded { documents, index })
    }

    /// Answer `user_message` from the indexed documents.
    ///
    /// `request_body["stream"]` (a JSON bool) picks the response mode,
    /// falling back to the `stream` valve. `model_id` and `messages` are
    /// recorded on the request span only; the prompt is built from the
    /// retrieved context and `user_message` alone.
    pub async fn pipe(
        &self,
        user_message: &str,
        model_id: &str,
        messages: &[ChatMessage],
        request_body: &Map<String, Value>,
    ) -> Result<PipeOutput> {
        let span = tracing::info_span!(
            "pipe",
            request_id = %Uuid::new_v4(),
            model_id,
            history = messages.len()
        );
        self.answer(user_message, request_body).instrument(span).await
    }

    async fn answer(
        &self,
        user_message: &str,
        request_body: &Map<String, Value>,
    ) -> Result<PipeOutput> {
        if user_message.trim().is_empty() {
            return Err(PipelineError::InvalidQuery("user message is empty".into()));
        }
        let state = self.state.as_ref().ok_or(PipelineError::NotStarted)?;

        let stream = request_body
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(self.valves.stream);
        tracing::debug!(message = user_message, stream, "received message");

        let query_vec = match embed_query(self.embedder.as_ref(), user_message).await {
            Ok(v) if v.len() == state.index.dims() => v,
            Ok(v) => {
                return Ok(render_failure(ModelError::Decode(format!(
                    "query embedding has {} dimensions, index has {}",
                    v.len(),
                    state.index.dims()
                ))))
            }
            Err(e) => return Ok(render_failure(e)),
        };

        let passages = state.index.retrieve(&query_vec, self.valves.top_k);
        tracing::debug!(
            passages = passages.len(),
            sources = ?passages.iter().map(|p| p.source_id.as_str()).collect::<Vec<_>>(),
            "retrieved context"
        );
        let prompt = compose_prompt(&join_context(&passages), user_message);

        let output = if stream {
            match self.model.complete_stream(&prompt).await {
                Ok(tokens) => PipeOutput::Stream(tokens),
                Err(e) => render_failure(e),
            }
        } else {
            match self.model.complete(&prompt).await {
                Ok(text) => PipeOutput::Text(text),
                Err(e) => render_failure(e),
            }
        };
        Ok(output)
    }
}

fn render_failure(err: ModelError) -> PipeOutput {
    let err = PipelineError::ModelEndpoint(err);
    tracing::warn!(error = %err, "endpoint failure rendered as response text");
    PipeOutput::Text(format!("Error: {}", err))
}
