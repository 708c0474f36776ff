//! Language-model endpoint client.
//!
//! [`LanguageModel`] is the completion seam used by the pipeline and by crew
//! stages. [`OllamaClient`] implements it against
//! `POST {base_url}/api/generate`:
//!
//! ```json
//! { "model": "llama3", "prompt": "...", "stream": false,
//!   "options": { "max_tokens": 256, "stop": [] } }
//! ```
//!
//! A 200 response carries the completion in `response` (or `text`). Any
//! other status is a [`ModelError::Status`]. Streaming responses are
//! newline-delimited JSON objects of the same shape, decoded by
//! [`ndjson_fragments`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::Valves;
use crate::stream::{ndjson_fragments, CompletionChunk, TokenStream};

/// Failure talking to the model or embedding endpoint.
///
/// The `Display` text is what a chat caller ends up seeing, so it names the
/// status code and body, or the transport problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot connect to model endpoint ({0})")]
    Connection(String),

    #[error("model endpoint timed out ({0})")]
    Timeout(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("invalid response from model endpoint: {0}")]
    Decode(String),
}

pub(crate) fn map_transport_error(e: reqwest::Error, base_url: &str) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(format!("{}: {}", base_url, e))
    } else if e.is_connect() {
        ModelError::Connection(format!("is the server running at {}? {}", base_url, e))
    } else {
        ModelError::Http(e.to_string())
    }
}

/// A text-completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Wait for the full completion.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;

    /// Start a completion and return its fragments as they arrive.
    ///
    /// Errors returned here happen before any fragment (connect failure,
    /// non-success status). Failures after that end the stream early.
    async fn complete_stream(&self, prompt: &str) -> Result<TokenStream, ModelError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Serialize)]
struct GenerateOptions<'a> {
    max_tokens: u32,
    stop: &'a [String],
}

/// Ollama HTTP client for completions.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    num_output: u32,
    stop: Vec<String>,
    timeout: Duration,
}

impl OllamaClient {
    /// Build a client from the valves. The timeout bounds the whole request
    /// in blocking mode. In streaming mode it bounds the connect, the wait
    /// for response headers, and each gap between body reads.
    pub fn new(valves: &Valves) -> Result<Self, ModelError> {
        let timeout = Duration::from_secs(valves.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: valves.base_url.clone(),
            model: valves.model_name.clone(),
            api_key: valves.api_key.clone(),
            num_output: valves.num_output,
            stop: valves.stop.clone(),
            timeout,
        })
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, ModelError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
            options: GenerateOptions {
                max_tokens: self.num_output,
                stop: &self.stop,
            },
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if !stream {
            request = request.timeout(self.timeout);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| {
                ModelError::Timeout(format!(
                    "{}: no response within {}s",
                    self.base_url,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| map_transport_error(e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "model endpoint returned an error status");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let response = self.send(prompt, false).await?;
        let parsed: CompletionChunk = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(format!("{}: {}", self.base_url, e))
            } else {
                ModelError::Decode(e.to_string())
            }
        })?;
        Ok(parsed.into_text().trim().to_string())
    }

    async fn complete_stream(&self, prompt: &str) -> Result<TokenStream, ModelError> {
        let response = self.send(prompt, true).await?;
        Ok(ndjson_fragments(response.bytes_stream()))
    }
}
