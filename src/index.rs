//! Immutable in-memory vector index.
//!
//! Built once from the ingested documents: each document is chunked, chunk
//! texts are embedded (identical texts only once), and the vectors are kept
//! next to their chunks. Retrieval is brute-force cosine similarity over
//! all entries. There is no update path; a rebuild produces a new index.

use std::collections::HashMap;

use crate::chunk::chunk_document;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, Document, Passage};

/// Texts per embedding request.
pub const EMBED_BATCH_SIZE: usize = 64;

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dims: usize,
    embedding_model: String,
}

impl VectorIndex {
    /// Chunk, embed and index `docs`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::IndexBuild`] if there is nothing to index, the
    /// embedder fails, or it returns the wrong number of vectors, empty
    /// vectors, or vectors of differing dimensionality.
    pub async fn build(
        docs: &[Document],
        embedder: &dyn Embedder,
        max_tokens: usize,
    ) -> Result<Self> {
        let chunks: Vec<Chunk> = docs
            .iter()
            .flat_map(|doc| chunk_document(doc, max_tokens))
            .collect();
        if chunks.is_empty() {
            return Err(PipelineError::IndexBuild("documents produced no chunks".into()));
        }

        // Unique texts in first-seen order.
        let mut slot_by_hash: HashMap<&str, usize> = HashMap::new();
        let mut unique: Vec<String> = Vec::new();
        let mut slots = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let slot = *slot_by_hash.entry(chunk.hash.as_str()).or_insert_with(|| {
                unique.push(chunk.text.clone());
                unique.len() - 1
            });
            slots.push(slot);
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(unique.len());
        for batch in unique.chunks(EMBED_BATCH_SIZE) {
            let embedded = embedder
                .embed(batch)
                .await
                .map_err(|e| PipelineError::IndexBuild(format!("embedding failed: {}", e)))?;
            if embedded.len() != batch.len() {
                return Err(PipelineError::IndexBuild(format!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }

        let dims = vectors[0].len();
        if dims == 0 {
            return Err(PipelineError::IndexBuild("embedder returned empty vectors".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(PipelineError::IndexBuild(format!(
                "inconsistent embedding dimensions: {} vs {}",
                dims,
                bad.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(slots)
            .map(|(chunk, slot)| IndexEntry {
                chunk,
                vector: vectors[slot].clone(),
            })
            .collect::<Vec<_>>();

        tracing::info!(
            documents = docs.len(),
            chunks = entries.len(),
            embedded = unique.len(),
            dims,
            model = embedder.model_name(),
            "vector index built"
        );

        Ok(Self {
            entries,
            dims,
            embedding_model: embedder.model_name().to_string(),
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Up to `top_k` passages by descending similarity. Ties keep index order.
    /// A non-numeric score (from non-finite vector components) ranks last.
    pub fn retrieve(&self, query_vec: &[f32], top_k: usize) -> Vec<Passage> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| {
                let score = cosine_similarity(query_vec, &entry.vector);
                let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
                (score, entry)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(top_k)
            .map(|(_, entry)| Passage {
                source_id: entry.chunk.source_id.clone(),
                text: entry.chunk.text.clone(),
            })
            .collect()
    }
}
