//! # ragpipe
//!
//! A retrieval-augmented question answering pipeline over a local document
//! folder, backed by an Ollama-compatible model server, plus a small
//! sequential multi-agent writing demo.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ connector_fs│──▶│ chunk+embed │──▶│ VectorIndex  │
//! │ (documents) │   │  (startup)  │   │ (in memory)  │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ top_k
//!   user message ──▶ embed query ────────────┤
//!                                            ▼
//!                                  ┌──────────────────┐
//!                                  │ prompt ─▶ model  │──▶ text | token stream
//!                                  └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragpipe ingest --path ./docs            # list what would be indexed
//! ragpipe ask "What is the refund policy?"
//! ragpipe crew rsac --seed rsac_seed.txt  # multi-agent demo
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Valves: defaults, TOML file, environment overrides |
//! | [`error`] | Pipeline error type |
//! | [`models`] | Core data types |
//! | [`connector_fs`] | Document folder scan |
//! | [`extract`] | PDF and text extraction |
//! | [`chunk`] | Paragraph chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory cosine vector index |
//! | [`prompt`] | Context + question prompt template |
//! | [`llm`] | Language model abstraction and Ollama client |
//! | [`stream`] | Token streams and NDJSON decoding |
//! | [`pipeline`] | Lifecycle hooks and the `pipe` entry point |
//! | [`crew`] | Sequential agent crew |
//! | [`telemetry`] | Log subscriber setup |

pub mod chunk;
pub mod config;
pub mod connector_fs;
pub mod crew;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod stream;
pub mod telemetry;

pub use config::Valves;
pub use error::{PipelineError, Result};
pub use pipeline::{PipeOutput, Pipeline};
