//! Cumulative per-keyword result store.
//!
//! Extraction results accumulate in one CSV file per keyword, one row per
//! processed document. The header is written exactly once, when the file
//! is new or empty; later appends lay their answers out under the columns
//! already in the file, so rows stay aligned across runs.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::extract::fallback_answers;
use crate::paths::results_file_name;

/// Name of the leading column holding the document file name.
pub const DOCUMENT_COLUMN: &str = "PDF Name";

/// One extraction result: a document name plus its answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// File name of the document the answers describe.
    pub document: String,
    /// Answers keyed by question, in column order.
    pub answers: IndexMap<String, String>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(document: impl Into<String>, answers: IndexMap<String, String>) -> Self {
        Self {
            document: document.into(),
            answers,
        }
    }

    /// Record for a document whose extraction could not complete: every
    /// question maps to the limit sentinel.
    #[must_use]
    pub fn fallback(document: impl Into<String>) -> Self {
        Self::new(document, fallback_answers())
    }
}

/// Errors raised by the result store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while touching the store file.
    #[error("failed to {action} result store {}: {source}", path.display())]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// The store file involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The store file holds rows the CSV reader cannot parse.
    #[error("malformed result store {}: {source}", path.display())]
    Malformed {
        /// The store file involved.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

/// Append-only CSV store of extraction results for one keyword.
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `dir` named after the keyword's slug.
    #[must_use]
    pub fn for_keyword(dir: &Path, keyword: &str) -> Self {
        Self::new(dir.join(results_file_name(keyword)))
    }

    /// The store file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as one row, never rewriting earlier rows.
    ///
    /// The first record ever written fixes the column set: the document
    /// column followed by that record's questions in order. Every later
    /// append reuses the header already in the file, filling columns the
    /// record lacks with empty cells and dropping answers that have no
    /// column.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Malformed`] when the
    /// row cannot be written.
    #[instrument(skip(self, record), fields(document = %record.document))]
    pub fn append(&self, record: &AnswerRecord) -> Result<(), StoreError> {
        let existing = self.existing_columns()?;
        let needs_header = existing.is_none();
        let columns = existing.unwrap_or_else(|| {
            std::iter::once(DOCUMENT_COLUMN.to_string())
                .chain(record.answers.keys().cloned())
                .collect()
        });

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                action: "create directory for",
                path: self.path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::Io {
                action: "open",
                path: self.path.clone(),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(&columns).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        }

        let row: Vec<&str> = columns
            .iter()
            .map(|column| {
                if column == DOCUMENT_COLUMN {
                    record.document.as_str()
                } else {
                    record.answers.get(column).map_or("", String::as_str)
                }
            })
            .collect();
        writer
            .write_record(&row)
            .and_then(|()| writer.flush().map_err(csv::Error::from))
            .map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), wrote_header = needs_header, "appended result row");
        Ok(())
    }

    /// Column set already in the file, when it exists and is non-empty.
    fn existing_columns(&self) -> Result<Option<Vec<String>>, StoreError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    action: "inspect",
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if metadata.len() == 0 {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        let headers = reader.headers().map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(headers.iter().map(str::to_string).collect()))
    }
}
