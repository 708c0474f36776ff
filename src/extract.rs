//! Text extraction for ingested files.
//!
//! PDF files go through `pdf-extract`. Anything else must already be UTF-8
//! text. Failures are returned, never panicked on; the connector logs and
//! skips the file.

use std::path::Path;

use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("file is not valid UTF-8 text")]
    NotUtf8,
}

/// Content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => MIME_PDF,
        Some("md") | Some("markdown") => MIME_MARKDOWN,
        _ => MIME_TEXT,
    }
}

/// Extracts plain text from raw file bytes.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        _ => String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
