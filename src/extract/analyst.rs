//! The answering capability behind questionnaire extraction.
//!
//! [`DocumentAnalyst`] is the seam the extraction flow talks to: give it a
//! document and the question set, get back raw reply text. The production
//! implementation is [`RetrievalAnalyst`], which chunks and embeds the
//! document, retrieves the chunks closest to the questionnaire, and asks a
//! chat model to answer over them. [`ScriptedAnalyst`] stands in for tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, instrument};

use super::openai::{OpenAiClient, OpenAiError};
use super::semantic::{ChunkStore, MemoryChunkStore, SemanticError};
use super::text::{TextError, extract_text, split_chunks};

/// Retrieved chunks handed to the chat model per document.
const DEFAULT_TOP_K: usize = 5;

/// Standing instructions for the answering model.
const SYSTEM_PROMPT: &str = "You are an expert in extracting and analyzing data from PDF \
    documents, focusing on historical and environmental research. Your task is to extract \
    specific information from the given PDF content and provide answers in JSON format.";

/// Errors from asking an analyst about a document.
#[derive(Debug, Error)]
pub enum AnalystError {
    /// The document's text layer could not be read.
    #[error(transparent)]
    Text(#[from] TextError),

    /// The document produced no text at all.
    #[error("no text extracted from {}", path.display())]
    EmptyDocument { path: PathBuf },

    /// Embedding or chunk retrieval failed.
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// The answering service call failed.
    #[error(transparent)]
    Service(#[from] OpenAiError),
}

/// Capability that answers the questionnaire for one document.
#[async_trait]
pub trait DocumentAnalyst: Send + Sync {
    /// Asks `questions` of the document at `document_path`, returning the
    /// raw reply text for the caller to parse.
    async fn ask(
        &self,
        document_path: &Path,
        keyword: &str,
        questions: &[&str],
    ) -> Result<String, AnalystError>;
}

/// Retrieval-augmented [`DocumentAnalyst`] over an OpenAI-compatible
/// service.
///
/// The document text is split into overlapping chunks, embedded into the
/// chunk store, and queried with the questionnaire itself; the best
/// matches become the context the chat model answers over.
pub struct RetrievalAnalyst {
    client: OpenAiClient,
    store: Arc<dyn ChunkStore>,
    top_k: usize,
}

impl RetrievalAnalyst {
    /// Creates an analyst backed by an in-memory chunk store that embeds
    /// through `client`.
    #[must_use]
    pub fn new(client: OpenAiClient) -> Self {
        let store = Arc::new(MemoryChunkStore::new(Arc::new(client.clone())));
        Self {
            client,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Replaces the chunk store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.store = store;
        self
    }

    /// Overrides how many retrieved chunks feed the chat model.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    async fn answer_over_text(
        &self,
        document: &str,
        text: &str,
        keyword: &str,
        questions: &[&str],
    ) -> Result<String, AnalystError> {
        let chunks = split_chunks(text);
        debug!(chunks = chunks.len(), "document chunked for retrieval");
        for (index, chunk) in chunks.iter().enumerate() {
            let mut metadata = IndexMap::new();
            metadata.insert("source".to_string(), document.to_string());
            metadata.insert("chunk".to_string(), index.to_string());
            self.store.upsert(&format!("{document}-chunk-{index}"), chunk, metadata).await?;
        }

        let task = task_message(keyword, questions);
        let hits = self.store.query(&task, self.top_k).await?;
        let context: Vec<&str> = hits.iter().map(|hit| hit.content.as_str()).collect();

        let user = format!("{task}\n\nRelevant content:\n{}", context.join("\n\n"));
        Ok(self.client.chat(SYSTEM_PROMPT, &user).await?)
    }
}

impl std::fmt::Debug for RetrievalAnalyst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalAnalyst")
            .field("client", &self.client)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentAnalyst for RetrievalAnalyst {
    #[instrument(skip(self, questions), fields(document = %document_path.display()))]
    async fn ask(
        &self,
        document_path: &Path,
        keyword: &str,
        questions: &[&str],
    ) -> Result<String, AnalystError> {
        let text = extract_text(document_path).await?;
        if text.trim().is_empty() {
            return Err(AnalystError::EmptyDocument {
                path: document_path.to_path_buf(),
            });
        }

        let document = document_label(document_path);
        self.answer_over_text(&document, &text, keyword, questions).await
    }
}

/// The questionnaire task handed to the model, also used as the retrieval
/// query.
fn task_message(keyword: &str, questions: &[&str]) -> String {
    format!(
        "Given the retrieved content of a document found for the keyword \"{keyword}\", \
         extract answers to the following questions:\n{}\n\
         Your final answer MUST be in JSON format with the questions as keys.",
        questions.join("\n")
    )
}

fn document_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Deterministic in-process [`DocumentAnalyst`] for tests.
///
/// Replies are scripted up front and returned in order; a dry script
/// answers with an empty string. A scripted failure surfaces as if the
/// answering service had returned a 503.
#[derive(Debug, Default)]
pub struct ScriptedAnalyst {
    replies: Mutex<VecDeque<Result<String, String>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedAnalyst {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply.
    #[must_use]
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push_back(Ok(text.into()));
        self
    }

    /// Queues a service failure.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
        self
    }

    /// Document names asked so far, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl DocumentAnalyst for ScriptedAnalyst {
    async fn ask(
        &self,
        document_path: &Path,
        _keyword: &str,
        _questions: &[&str],
    ) -> Result<String, AnalystError> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(document_label(document_path));

        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()));
        next.map_err(|message| {
            AnalystError::Service(OpenAiError::Api {
                status: 503,
                message,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::extract::QUESTIONS;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    // ==================== Prompt Tests ====================

    #[test]
    fn test_task_message_carries_keyword_and_questions() {
        let task = task_message("baltic wrecks", &QUESTIONS);
        assert!(task.contains("\"baltic wrecks\""));
        for question in QUESTIONS {
            assert!(task.contains(question));
        }
        assert!(task.contains("MUST be in JSON format"));
    }

    #[test]
    fn test_document_label_prefers_file_name() {
        assert_eq!(document_label(Path::new("/pdf/reef/survey.pdf")), "survey.pdf");
    }

    // ==================== Retrieval Flow Tests ====================

    #[tokio::test]
    async fn test_answer_over_text_feeds_retrieved_context_to_chat() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [1.0, 0.0] }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-4" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "{\"q\": \"a\"}" } }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OpenAiClient::new("test-key").with_api_base(mock_server.uri());
        let analyst = RetrievalAnalyst::new(client);

        let reply = analyst
            .answer_over_text(
                "survey.pdf",
                "The wreck lies at 54.1N, 13.2E and leaks heavy fuel oil.",
                "baltic wrecks",
                &QUESTIONS,
            )
            .await
            .unwrap();

        assert_eq!(reply, "{\"q\": \"a\"}");

        let requests = mock_server.received_requests().await.unwrap();
        let chat_request = requests
            .iter()
            .find(|request| request.url.path() == "/chat/completions")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&chat_request.body).unwrap();
        let user_content = body["messages"][1]["content"].as_str().unwrap();
        assert!(user_content.contains("Relevant content:"));
        assert!(user_content.contains("heavy fuel oil"));
    }

    #[tokio::test]
    async fn test_ask_rejects_missing_document() {
        let client = OpenAiClient::new("test-key").with_api_base("http://127.0.0.1:9");
        let analyst = RetrievalAnalyst::new(client);

        let result = analyst
            .ask(Path::new("/nonexistent/missing.pdf"), "kw", &QUESTIONS)
            .await;

        assert!(matches!(result, Err(AnalystError::Text(_))));
    }

    // ==================== Scripted Analyst Tests ====================

    #[tokio::test]
    async fn test_scripted_analyst_returns_replies_in_order() {
        let analyst = ScriptedAnalyst::new().reply("first").reply("second");

        let one = analyst.ask(Path::new("a.pdf"), "kw", &QUESTIONS).await.unwrap();
        let two = analyst.ask(Path::new("b.pdf"), "kw", &QUESTIONS).await.unwrap();
        let dry = analyst.ask(Path::new("c.pdf"), "kw", &QUESTIONS).await.unwrap();

        assert_eq!(one, "first");
        assert_eq!(two, "second");
        assert_eq!(dry, "");
        assert_eq!(analyst.asked(), vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn test_scripted_analyst_failure_surfaces_as_service_error() {
        let analyst = ScriptedAnalyst::new().failing("backend offline");

        let error = analyst.ask(Path::new("a.pdf"), "kw", &QUESTIONS).await.unwrap_err();

        assert!(matches!(
            error,
            AnalystError::Service(OpenAiError::Api { status: 503, .. })
        ));
    }
}
