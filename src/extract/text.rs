//! Document text extraction and chunking.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Characters per retrieval chunk.
const CHUNK_SIZE: usize = 1000;

/// Characters shared between consecutive chunks.
const CHUNK_OVERLAP: usize = 200;

/// Errors from reading a document's text layer.
#[derive(Debug, Error)]
pub enum TextError {
    /// The document could not be decoded.
    #[error("failed to extract text from {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: pdf_extract::OutputError,
    },

    /// The blocking extraction task was cancelled or panicked.
    #[error("text extraction task failed: {0}")]
    Task(String),
}

/// Reads the text layer of the document at `path`.
///
/// `pdf_extract` is synchronous and CPU-bound, so the work runs on the
/// blocking pool.
pub async fn extract_text(path: &Path) -> Result<String, TextError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || match pdf_extract::extract_text(&owned) {
        Ok(text) => Ok(text),
        Err(source) => Err(TextError::Extract { path: owned, source }),
    })
    .await
    .map_err(|join| TextError::Task(join.to_string()))?
}

/// Splits text into overlapping retrieval chunks.
///
/// Windows are [`CHUNK_SIZE`] characters long and consecutive windows
/// share [`CHUNK_OVERLAP`] characters, so context straddling a window
/// edge survives in the next chunk.
#[must_use]
pub fn split_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = usize::min(start + CHUNK_SIZE, chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
