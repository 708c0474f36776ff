//! Filesystem document source.
//!
//! Walks a directory (or accepts a single file), filters by include globs,
//! extracts text and returns documents sorted by relative path. The scan is
//! read-only and blocking; it runs once per startup.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::extract::{content_type_for, extract_text};
use crate::models::Document;

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Scan `root` for eligible documents.
///
/// A file is eligible when it matches `include_globs`, is not under an
/// excluded directory, and yields non-empty text. Unreadable files are
/// skipped with a warning.
///
/// # Errors
///
/// - [`PipelineError::DocumentSourceNotFound`] if `root` does not exist.
/// - [`PipelineError::EmptyCorpus`] if nothing eligible is found.
/// - [`PipelineError::Configuration`] for an invalid glob.
pub fn scan_documents(root: &Path, include_globs: &[String]) -> Result<Vec<Document>> {
    if !root.exists() {
        return Err(PipelineError::DocumentSourceNotFound(root.to_path_buf()));
    }

    let mut docs = Vec::new();

    if root.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        if let Some(doc) = read_document(root, &name) {
            docs.push(doc);
        }
    } else {
        let include_set = build_globset(include_globs)?;
        let exclude_set = build_globset(DEFAULT_EXCLUDES)?;

        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }

            if let Some(doc) = read_document(path, &rel_str) {
                docs.push(doc);
            }
        }

        // Sort for deterministic ordering
        docs.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    }

    if docs.is_empty() {
        return Err(PipelineError::EmptyCorpus(root.to_path_buf()));
    }

    tracing::debug!(root = %root.display(), documents = docs.len(), "document scan complete");
    Ok(docs)
}

fn read_document(path: &Path, source_id: &str) -> Option<Document> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    };

    let content_type = content_type_for(path);
    let body = match extract_text(&bytes, content_type) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "skipping file");
            return None;
        }
    };

    if body.trim().is_empty() {
        tracing::debug!(file = %path.display(), "skipping empty file");
        return None;
    }

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Some(Document {
        source_id: source_id.to_string(),
        title,
        content_type: content_type.to_string(),
        body,
    })
}

fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.as_ref()).map_err(|e| {
            PipelineError::Configuration(format!("invalid glob '{}': {}", pattern.as_ref(), e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| PipelineError::Configuration(e.to_string()))
}
