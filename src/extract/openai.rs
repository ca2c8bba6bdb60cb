//! Client for OpenAI-compatible chat-completion and embedding endpoints.
//!
//! The answering flow needs exactly two calls: `/embeddings` to vectorize
//! chunks and queries, and `/chat/completions` to answer the questionnaire
//! over retrieved context. Base URL and model names are configurable so a
//! compatible proxy can stand in; the key comes from `OPENAI_API_KEY`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use super::semantic::{Embedder, SemanticError};

/// Default API base for OpenAI-compatible services.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default model for questionnaire answering.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Default model for chunk and query embeddings.
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-ada-002";

/// Environment variable the API key is read from.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Request timeout in seconds. Chat completions over large retrieved
/// contexts routinely take more than a minute.
const REQUEST_TIMEOUT_SECS: u64 = 180;

/// Errors from the answering service.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// The `OPENAI_API_KEY` environment variable is not set.
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// The request failed or the reply body could not be decoded.
    #[error("answering service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("answering service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The reply carried no choices.
    #[error("answering service reply was empty")]
    EmptyReply,
}

/// Client for one OpenAI-compatible service.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_base: String,
    api_key: String,
    chat_model: String,
    embed_model: String,
}

impl OpenAiClient {
    /// Creates a client with the default API base and models.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
        }
    }

    /// Creates a client keyed from the [`API_KEY_VAR`] environment
    /// variable.
    pub fn from_env() -> Result<Self, OpenAiError> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| OpenAiError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Overrides the API base URL. A trailing slash is tolerated.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let base: String = api_base.into();
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the chat-completion model.
    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Overrides the embedding model.
    #[must_use]
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Sends one system+user exchange and returns the assistant's reply.
    #[instrument(skip(self, system, user), fields(model = %self.chat_model))]
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, OpenAiError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = reject_error_status(response).await?;

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(OpenAiError::EmptyReply)?;
        debug!(chars = content.len(), "chat reply received");
        Ok(content)
    }

    /// Embeds each input text, preserving input order.
    #[instrument(skip(self, texts), fields(model = %self.embed_model, inputs = texts.len()))]
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OpenAiError> {
        let request = EmbeddingRequest { model: &self.embed_model, input: texts };

        let response = self
            .http
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = reject_error_status(response).await?;

        let mut reply: EmbeddingResponse = response.json().await?;
        // The wire format carries an index per row; order by it rather
        // than trusting the row order.
        reply.data.sort_by_key(|row| row.index);
        Ok(reply.data.into_iter().map(|row| row.embedding).collect())
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_base", &self.api_base)
            .field("chat_model", &self.chat_model)
            .field("embed_model", &self.embed_model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        self.embed_texts(texts).await.map_err(|error| SemanticError::Embed(error.to_string()))
    }
}

async fn reject_error_status(response: reqwest::Response) -> Result<reqwest::Response, OpenAiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OpenAiError::Api { status: status.as_u16(), message: excerpt(&body) })
}

/// First part of an error body, enough to diagnose without dumping pages.
fn excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    if body.chars().count() <= MAX_CHARS {
        body.trim().to_string()
    } else {
        let head: String = body.chars().take(MAX_CHARS).collect();
        format!("{}...", head.trim())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}
