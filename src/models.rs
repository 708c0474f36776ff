//! Core data models used throughout the pipeline.
//!
//! These types represent the documents, chunks, and retrieved passages that
//! flow through ingestion, indexing, and query.

use serde::{Deserialize, Serialize};

/// One ingested source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the document root (or the file name for a single-file source).
    pub source_id: String,
    pub title: String,
    pub content_type: String,
    pub body: String,
}

/// A chunk of a document's body text.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// `"{source_id}#{index}"`.
    pub id: String,
    pub source_id: String,
    pub index: usize,
    pub text: String,
    /// SHA-256 hex of `text`.
    pub hash: String,
}

/// A passage returned by retrieval. Scores stay inside the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub source_id: String,
    pub text: String,
}

/// One turn of conversation history as sent by a chat front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}
