//! Questionnaire extraction over downloaded documents.
//!
//! Every document answers the same fixed questionnaire. The analyst reads
//! the document, retrieves the most relevant chunks, and asks an
//! OpenAI-compatible chat model for a JSON object keyed by the questions;
//! the extractor parses that reply, falls back to sentinel answers when
//! the attempt dies, and hands the record to the result store.
//!
//! # Architecture
//!
//! - [`QUESTIONS`] / [`fallback_answers`] - the canonical questionnaire
//!   and its sentinel answers
//! - [`DocumentAnalyst`] / [`RetrievalAnalyst`] - the answering capability
//! - [`ChunkStore`] / [`MemoryChunkStore`] - embedded-chunk retrieval
//! - [`OpenAiClient`] - chat-completion and embedding transport
//! - [`Extractor`] - per-document drive, fallback, and normalization

mod analyst;
mod extractor;
mod openai;
mod parse;
mod questions;
mod semantic;
mod text;

pub use analyst::{AnalystError, DocumentAnalyst, RetrievalAnalyst, ScriptedAnalyst};
pub use extractor::{ExtractError, Extractor, list_documents};
pub use openai::{
    API_KEY_VAR, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL, OpenAiClient,
    OpenAiError,
};
pub use parse::{ParseError, isolate_json, parse_answers, parse_with_retry};
pub use questions::{
    BUDGET_MARKER, LIMIT_SENTINEL, QUESTIONS, fallback_answers, normalize_answers,
};
pub use semantic::{ChunkStore, Embedder, MemoryChunkStore, ScoredChunk, SemanticError};
pub use text::{TextError, extract_text, split_chunks};
