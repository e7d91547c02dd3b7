//! Overlapping token-window text splitter.
//!
//! Splits a document into chunks of at most `chunk_size` tokens where
//! consecutive chunks share exactly `overlap` tokens (except possibly the
//! last). Tokens are whitespace-separated words — a deterministic
//! approximation of the GPT-2 token splitter used by transformer-tuned
//! pipelines; chunks are re-joined with single spaces.
//!
//! The function is pure: the same `(text, chunk_size, overlap)` always
//! yields the same chunk sequence, so a rerun over the same document is
//! restartable.

use crate::error::RetrievalError;

/// Split `text` into overlapping token-bounded chunks.
///
/// `overlap` must satisfy `0 <= overlap < chunk_size`; this is validated
/// at configuration load, and violating it here is reported as a
/// recoverable [`RetrievalError::ChunkingFailure`] rather than a panic.
///
/// Empty or whitespace-only input yields an empty sequence.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, RetrievalError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(RetrievalError::ChunkingFailure(format!(
            "invalid window: chunk_size={}, overlap={}",
            chunk_size, overlap
        )));
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let stride = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(tokens.len());
        chunks.push(tokens[start..end].join(" "));
        if end == tokens.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}
