//! Prompt composition.
//!
//! The prompt is always context first, then the question:
//!
//! ```text
//! Context: {context}
//!
//! Question: {user_message}
//! Answer:
//! ```

use crate::models::Passage;

/// Separator between retrieved passages inside the context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Join passages in retrieval order.
pub fn join_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

pub fn compose_prompt(context: &str, user_message: &str) -> String {
    format!("Context: {}\n\nQuestion: {}\nAnswer:", context, user_message)
}
