//! Error taxonomy for the pipeline.
//!
//! Startup failures ([`PipelineError::Configuration`],
//! [`PipelineError::DocumentSourceNotFound`], [`PipelineError::EmptyCorpus`],
//! [`PipelineError::IndexBuild`]) are fatal: the pipeline never starts with
//! a partial or empty index. Per-query failures split in two:
//! [`PipelineError::InvalidQuery`] propagates to the caller, while
//! [`PipelineError::ModelEndpoint`] is rendered into displayable text by
//! [`Pipeline::pipe`](crate::pipeline::Pipeline::pipe) and never escapes it.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::ModelError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("document path '{}' not found", .0.display())]
    DocumentSourceNotFound(PathBuf),

    #[error("no readable documents found under '{}'", .0.display())]
    EmptyCorpus(PathBuf),

    #[error("index build failed: {0}")]
    IndexBuild(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    ModelEndpoint(#[from] ModelError),

    #[error("pipeline has not completed startup")]
    NotStarted,
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
