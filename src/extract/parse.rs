//! Parsing of raw questionnaire replies into answer sets.
//!
//! Replies arrive as free text that usually carries a JSON object, often
//! wrapped in prose or markdown code fences. Parsing isolates the span
//! between the first `{` and the last `}`, strips fence markers, and
//! decodes whatever remains. A reply may also carry a list of answer
//! objects; the first one wins.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::download::{FailureType, RetryDecision, RetryPolicy};

/// Errors from decoding a questionnaire reply.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The isolated payload is not valid JSON.
    #[error("malformed answer payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The reply decoded to an empty list of answer sets.
    #[error("reply held an empty list of answer sets")]
    EmptyList,
}

/// One answer object, or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    One(IndexMap<String, Value>),
    Many(Vec<IndexMap<String, Value>>),
}

fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Cuts a reply down to its likely JSON payload.
///
/// Strips markdown code-fence markers, then isolates the span from the
/// first `{` to the last `}`. A reply with no brace pair is returned
/// whole, fences removed.
#[must_use]
pub fn isolate_json(raw: &str) -> String {
    let stripped = strip_fences(raw);
    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start <= end => stripped[start..=end].to_string(),
        _ => stripped,
    }
}

/// Decodes a reply into a single answer set.
///
/// List replies are collapsed to their first record. Non-string answer
/// values are rendered through their JSON form, except `null`, which
/// becomes an empty string.
pub fn parse_answers(raw: &str) -> Result<IndexMap<String, String>, ParseError> {
    // A reply that is already a bare JSON value decodes directly; one
    // buried in prose needs the brace-isolated span.
    let payload: Payload = serde_json::from_str(&strip_fences(raw))
        .or_else(|_| serde_json::from_str(&isolate_json(raw)))?;
    let record = match payload {
        Payload::One(record) => record,
        Payload::Many(records) => records.into_iter().next().ok_or(ParseError::EmptyList)?,
    };
    Ok(record.into_iter().map(|(question, value)| (question, render_value(value))).collect())
}

fn render_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Runs [`parse_answers`] under a retry policy, pausing between attempts.
///
/// Every parse failure counts as one attempt against the policy's budget;
/// the last failure is returned once the budget is spent.
pub async fn parse_with_retry(
    raw: &str,
    policy: &RetryPolicy,
) -> Result<IndexMap<String, String>, ParseError> {
    let mut attempt = 1;
    loop {
        match parse_answers(raw) {
            Ok(answers) => {
                debug!(attempt, answers = answers.len(), "parsed answer payload");
                return Ok(answers);
            }
            Err(error) => match policy.should_retry(FailureType::Transient, attempt) {
                RetryDecision::Retry { delay, attempt: next_attempt } => {
                    warn!(%error, attempt, "failed to parse answer payload; retrying");
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(%error, reason, "giving up on answer payload");
                    return Err(error);
                }
            },
        }
    }
}
