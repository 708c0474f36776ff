//! Lazily produced response fragments.
//!
//! [`TokenStream`] is a finite, non-restartable sequence of text fragments.
//! Fragments are produced only as the consumer polls; dropping the stream
//! stops production. After the stream ends it keeps returning `None`.
//!
//! [`ndjson_fragments`] adapts a raw byte stream of newline-delimited JSON
//! completion objects (the Ollama streaming wire format) into a
//! [`TokenStream`]. A transport error or an unparsable line ends the
//! sequence early; fragments already yielded stand.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;

pub struct TokenStream {
    inner: Pin<Box<dyn Stream<Item = String> + Send>>,
}

impl TokenStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = String> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream.fuse()),
        }
    }

    /// A stream over already-known fragments.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(fragments))
    }

    /// Drain the stream and concatenate every fragment.
    pub async fn collect_text(mut self) -> String {
        let mut out = String::new();
        while let Some(fragment) = self.next().await {
            out.push_str(&fragment);
        }
        out
    }
}

impl Stream for TokenStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStream").finish_non_exhaustive()
    }
}

/// One streamed completion object. `response` is Ollama's field; `text`
/// is accepted from other completion servers.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub done: bool,
}

impl CompletionChunk {
    pub fn into_text(self) -> String {
        self.response.or(self.text).unwrap_or_default()
    }
}

struct LineState<S> {
    bytes: Pin<Box<S>>,
    buf: Vec<u8>,
    finished: bool,
}

enum Line {
    Fragment { text: String, done: bool },
    Blank,
    Invalid(String),
}

fn parse_line(raw: &[u8]) -> Line {
    let decoded = match std::str::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => return Line::Invalid(e.to_string()),
    };
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    match serde_json::from_str::<CompletionChunk>(trimmed) {
        Ok(chunk) => {
            let done = chunk.done;
            Line::Fragment {
                text: chunk.into_text(),
                done,
            }
        }
        Err(e) => Line::Invalid(e.to_string()),
    }
}

/// Decode newline-delimited completion objects into text fragments.
///
/// Empty fragments are skipped. A line with `"done": true` ends the stream
/// after its own fragment.
pub fn ndjson_fragments<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = LineState {
        bytes: Box::pin(bytes),
        buf: Vec::new(),
        finished: false,
    };

    TokenStream::new(stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }

            let line = if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                st.buf.drain(..=pos).collect()
            } else {
                match st.bytes.as_mut().next().await {
                    Some(Ok(chunk)) => {
                        st.buf.extend_from_slice(chunk.as_ref());
                        continue;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "completion stream interrupted");
                        return None;
                    }
                    None => {
                        st.finished = true;
                        std::mem::take(&mut st.buf)
                    }
                }
            };

            match parse_line(&line) {
                Line::Blank => continue,
                Line::Invalid(e) => {
                    tracing::warn!(error = %e, "unparsable completion stream line");
                    return None;
                }
                Line::Fragment { text, done } => {
                    if done {
                        st.finished = true;
                    }
                    if text.is_empty() {
                        continue;
                    }
                    return Some((text, st));
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, std::io::Error>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    #[tokio::test]
    async fn test_from_fragments_in_order() {
        let s = TokenStream::from_fragments(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(s.collect_text().await, "AB");
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let chunks = ok_chunks(&[
            "{\"response\":\"Hel",
            "lo\"}\n{\"response\":\" wor\"}\n",
            "{\"response\":\"ld\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n",
        ]);
        let mut s = ndjson_fragments(stream::iter(chunks));
        let mut seen = Vec::new();
        while let Some(f) = s.next().await {
            seen.push(f);
        }
        assert_eq!(seen, vec!["Hello", " wor", "ld"]);
        // Fused: stays finished.
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_text_field_and_trailing_line_without_newline() {
        let chunks = ok_chunks(&["{\"text\":\"x\"}\n\n{\"text\":\"y\"}"]);
        let s = ndjson_fragments(stream::iter(chunks));
        assert_eq!(s.collect_text().await, "xy");
    }

    #[tokio::test]
    async fn test_done_stops_before_later_lines() {
        let chunks = ok_chunks(&["{\"response\":\"a\",\"done\":true}\n{\"response\":\"b\"}\n"]);
        let s = ndjson_fragments(stream::iter(chunks));
        assert_eq!(s.collect_text().await, "a");
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial_output() {
        let items: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"response\":\"A\"}\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"{\"response\":\"B\"}\n".to_vec()),
        ];
        let s = ndjson_fragments(stream::iter(items));
        assert_eq!(s.collect_text().await, "A");
    }

    #[tokio::test]
    async fn test_invalid_line_ends_stream() {
        let chunks = ok_chunks(&["{\"response\":\"A\"}\nnot json\n{\"response\":\"B\"}\n"]);
        let s = ndjson_fragments(stream::iter(chunks));
        assert_eq!(s.collect_text().await, "A");
    }

    #[tokio::test]
    async fn test_non_utf8_line_ends_stream() {
        let items: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"response\":\"A\"}\n".to_vec()),
            Ok(b"{\"response\":\"\xff\xfe\"}\n".to_vec()),
            Ok(b"{\"response\":\"B\"}\n".to_vec()),
        ];
        let s = ndjson_fragments(stream::iter(items));
        assert_eq!(s.collect_text().await, "A");
    }
}
