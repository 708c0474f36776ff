//! Paragraph-boundary text chunker.
//!
//! Splits a document body into [`Chunk`]s that respect a `max_tokens`
//! limit. Splitting happens on paragraph boundaries (`\n\n`) first; a
//! paragraph that alone exceeds the limit is hard-split at a newline or
//! space, never inside a UTF-8 character.

use sha2::{Digest, Sha256};

use crate::models::{Chunk, Document};

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split a document into chunks with contiguous indices starting at 0.
///
/// Blank bodies produce no chunks.
pub fn chunk_document(doc: &Document, max_tokens: usize) -> Vec<Chunk> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for para in doc.body.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current.is_empty() {
            trimmed.len()
        } else {
            current.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }

        if trimmed.len() > max_chars {
            hard_split(trimmed, max_chars, &mut pieces);
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(trimmed);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| make_chunk(&doc.source_id, index, text))
        .collect()
}

fn hard_split(text: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_chars {
            out.push(remaining.trim().to_string());
            break;
        }
        let mut limit = max_chars;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            // A single character wider than the limit.
            limit = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|pos| pos + 1)
            .filter(|&pos| pos > 0 && pos <= limit)
            .unwrap_or(limit);
        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = &remaining[split_at..];
    }
}

fn make_chunk(source_id: &str, index: usize, text: String) -> Chunk {
    Chunk {
        id: format!("{}#{}", source_id, index),
        source_id: source_id.to_string(),
        index,
        hash: content_hash(&text),
        text,
    }
}

/// SHA-256 hex digest of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document {
            source_id: "doc1.md".to_string(),
            title: "doc1.md".to_string(),
            content_type: "text/markdown".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_document(&doc("Hello, world!"), 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].id, "doc1.md#0");
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_blank_text_no_chunks() {
        assert!(chunk_document(&doc("  \n\n  "), 700).is_empty());
    }

    #[test]
    fn test_multiple_paragraphs_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_document(&doc(text), 700);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("First paragraph."));
        assert!(chunks[0].text.ends_with("Third paragraph."));
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_document(&doc(&text), 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "Index mismatch at position {}", i);
            assert!(c.text.len() <= 40);
        }
    }

    #[test]
    fn test_long_multibyte_paragraph_does_not_panic() {
        let text = "é".repeat(100);
        let chunks = chunk_document(&doc(&text), 1);
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_hash_tracks_text() {
        let a = chunk_document(&doc("Alpha\n\nBeta"), 2);
        assert_eq!(a.len(), 2);
        assert_ne!(a[0].hash, a[1].hash);
        assert_eq!(a[0].hash, content_hash("Alpha"));
    }
}
