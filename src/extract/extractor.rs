//! Drives the questionnaire over downloaded documents.
//!
//! For each document the flow is: hand it to the analyst, watch the reply
//! for the budget marker, parse the answers under the bounded retry
//! policy, and normalize onto the canonical questionnaire. Anything that
//! goes wrong after the document was found still yields a record, with
//! every answer set to the limit sentinel, so the result store shows the
//! attempt rather than silently skipping the document.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, instrument, warn};

use super::analyst::DocumentAnalyst;
use super::parse::parse_with_retry;
use super::questions::{BUDGET_MARKER, QUESTIONS, normalize_answers};
use crate::download::RetryPolicy;
use crate::paths::keyword_dir;
use crate::store::AnswerRecord;

/// Errors from enumerating a keyword's documents.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The keyword's download directory could not be read.
    #[error("failed to read document directory {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs the questionnaire for documents under one output root.
pub struct Extractor {
    analyst: Arc<dyn DocumentAnalyst>,
    output_root: PathBuf,
    retry: RetryPolicy,
}

impl Extractor {
    /// Creates an extractor reading documents under `./pdf`.
    #[must_use]
    pub fn new(analyst: Arc<dyn DocumentAnalyst>) -> Self {
        Self {
            analyst,
            output_root: PathBuf::from("./pdf"),
            retry: RetryPolicy::json_parse(),
        }
    }

    /// Overrides the directory downloads were saved under.
    #[must_use]
    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    /// Overrides the reply-parsing retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Lists the downloaded documents for `keyword`, sorted by name.
    ///
    /// A keyword with no download directory yet simply has no documents.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::ListDir`] when the directory exists but
    /// cannot be read.
    pub fn list_documents(&self, keyword: &str) -> Result<Vec<String>, ExtractError> {
        list_documents(&self.output_root, keyword)
    }

    /// Runs the questionnaire for one document of `keyword`.
    ///
    /// Returns `None` only when the document is not present in the
    /// keyword's download directory. Every failure after that point, from
    /// the analyst stopping on its own budget to an unparseable reply,
    /// produces a fallback record instead.
    #[instrument(skip(self), fields(keyword = %keyword))]
    pub async fn process_document(&self, document_name: &str, keyword: &str) -> Option<AnswerRecord> {
        let path = keyword_dir(&self.output_root, keyword).join(document_name);
        if !path.is_file() {
            error!(path = %path.display(), "document not found; nothing to extract");
            return None;
        }

        let raw = match self.analyst.ask(&path, keyword, &QUESTIONS).await {
            Ok(raw) => raw,
            Err(analyst_error) => {
                warn!(error = %analyst_error, "analyst failed; recording fallback answers");
                return Some(AnswerRecord::fallback(document_name));
            }
        };

        if raw.trim().is_empty() || raw.contains(BUDGET_MARKER) {
            warn!("analyst stopped before answering; recording fallback answers");
            return Some(AnswerRecord::fallback(document_name));
        }

        match parse_with_retry(&raw, &self.retry).await {
            Ok(answers) => Some(AnswerRecord::new(document_name, normalize_answers(&answers))),
            Err(parse_error) => {
                warn!(error = %parse_error, "unparseable reply; recording fallback answers");
                Some(AnswerRecord::fallback(document_name))
            }
        }
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("output_root", &self.output_root)
            .finish_non_exhaustive()
    }
}

/// Lists the downloaded documents for `keyword` under `output_root`,
/// sorted by name. Standalone so callers can enumerate documents without
/// assembling a full extractor.
///
/// # Errors
///
/// Returns [`ExtractError::ListDir`] when the keyword directory exists but
/// cannot be read.
pub fn list_documents(output_root: &Path, keyword: &str) -> Result<Vec<String>, ExtractError> {
    let dir = keyword_dir(output_root, keyword);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&dir).map_err(|source| ExtractError::ListDir {
        path: dir.clone(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ExtractError::ListDir {
            path: dir.clone(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".pdf") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::extract::questions::LIMIT_SENTINEL;
    use crate::extract::{ScriptedAnalyst, fallback_answers};

    const KEYWORD: &str = "baltic wrecks";

    /// Lays out `<root>/pdf/baltic_wrecks/` with the named documents.
    fn seed_documents(names: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let keyword_path = dir.path().join("pdf").join("baltic_wrecks");
        fs::create_dir_all(&keyword_path).unwrap();
        for name in names {
            fs::write(keyword_path.join(name), b"%PDF-placeholder").unwrap();
        }
        dir
    }

    fn quick_extractor(dir: &TempDir, analyst: ScriptedAnalyst) -> Extractor {
        Extractor::new(Arc::new(analyst))
            .with_output_root(dir.path().join("pdf"))
            .with_retry(RetryPolicy::no_delay(1))
    }

    // ==================== Listing Tests ====================

    #[test]
    fn test_list_documents_sorted_pdf_only() {
        let dir = seed_documents(&["beta.pdf", "alpha.pdf"]);
        let keyword_path = dir.path().join("pdf").join("baltic_wrecks");
        fs::write(keyword_path.join("notes.txt"), b"not a pdf").unwrap();
        fs::create_dir(keyword_path.join("nested.pdf")).unwrap();

        let extractor = quick_extractor(&dir, ScriptedAnalyst::new());
        let documents = extractor.list_documents(KEYWORD).unwrap();

        assert_eq!(documents, vec!["alpha.pdf", "beta.pdf"]);
    }

    #[test]
    fn test_list_documents_for_unknown_keyword_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = quick_extractor(&dir, ScriptedAnalyst::new());
        assert!(extractor.list_documents("never searched").unwrap().is_empty());
    }

    // ==================== Processing Tests ====================

    #[tokio::test]
    async fn test_missing_document_yields_no_record_and_no_ask() {
        let dir = seed_documents(&[]);
        let analyst = Arc::new(ScriptedAnalyst::new().reply("{\"q\": \"a\"}"));
        let extractor = Extractor::new(analyst.clone())
            .with_output_root(dir.path().join("pdf"))
            .with_retry(RetryPolicy::no_delay(1));

        let record = extractor.process_document("ghost.pdf", KEYWORD).await;

        assert!(record.is_none());
        assert!(analyst.asked().is_empty());
    }

    #[tokio::test]
    async fn test_good_reply_becomes_normalized_record() {
        let dir = seed_documents(&["survey.pdf"]);
        let reply = "```json\n{\"Who are the authors?\": \"Smith et al.\", \
                     \"What is the title of the page?\": \"Baltic wreck survey\"}\n```";
        let extractor = quick_extractor(&dir, ScriptedAnalyst::new().reply(reply));

        let record = extractor.process_document("survey.pdf", KEYWORD).await.unwrap();

        assert_eq!(record.document, "survey.pdf");
        assert_eq!(record.answers.len(), QUESTIONS.len());
        assert_eq!(record.answers.get("Who are the authors?").unwrap(), "Smith et al.");
        assert_eq!(record.answers.get("Are there mentions of sinking dates?").unwrap(), "");
        let keys: Vec<&str> = record.answers.keys().map(String::as_str).collect();
        assert_eq!(keys, QUESTIONS);
    }

    #[tokio::test]
    async fn test_budget_marker_reply_falls_back() {
        let dir = seed_documents(&["survey.pdf"]);
        let extractor = quick_extractor(
            &dir,
            ScriptedAnalyst::new().reply("Agent stopped due to iteration limit."),
        );

        let record = extractor.process_document("survey.pdf", KEYWORD).await.unwrap();

        assert_eq!(record.answers, fallback_answers());
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let dir = seed_documents(&["survey.pdf"]);
        let extractor = quick_extractor(&dir, ScriptedAnalyst::new());

        let record = extractor.process_document("survey.pdf", KEYWORD).await.unwrap();

        assert_eq!(record.answers.get(QUESTIONS[0]).unwrap(), LIMIT_SENTINEL);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_after_retries() {
        let dir = seed_documents(&["survey.pdf"]);
        let extractor = quick_extractor(
            &dir,
            ScriptedAnalyst::new().reply("I could not find any of that information."),
        );

        let record = extractor.process_document("survey.pdf", KEYWORD).await.unwrap();

        assert_eq!(record.answers, fallback_answers());
    }

    #[tokio::test]
    async fn test_analyst_failure_falls_back() {
        let dir = seed_documents(&["survey.pdf"]);
        let extractor = quick_extractor(&dir, ScriptedAnalyst::new().failing("backend offline"));

        let record = extractor.process_document("survey.pdf", KEYWORD).await.unwrap();

        assert_eq!(record.document, "survey.pdf");
        assert_eq!(record.answers, fallback_answers());
    }
}
