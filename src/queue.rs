//! Durable per-publisher download queues.
//!
//! Each publisher gets one single-column CSV file named `<slug>_urls.csv`
//! holding pending URLs, one per row, with no header. The files are the
//! contract between the search flow (producer) and the download workers
//! (consumers): anything appended survives a crash, and workers clear a
//! file only after attempting its whole batch, so delivery is
//! at-least-once and a retry can only re-download, never lose work.
//!
//! # Overview
//!
//! - [`DownloadQueue`] - Directory-level handle covering every publisher
//! - [`drain_file`] / [`clear_file`] - File-level operations for workers
//!   handed an explicit queue path
//! - [`infer_publisher`] - Recovers the publisher from a queue file name
//! - [`QueueError`] - Operation error types
//!
//! # Example
//!
//! ```ignore
//! use paperharvest_core::queue::DownloadQueue;
//! use paperharvest_core::classify::Publisher;
//!
//! let queue = DownloadQueue::new(".");
//! queue.append(Publisher::Wiley, "https://onlinelibrary.wiley.com/doi/10.1002/x")?;
//! let batch = queue.drain(Publisher::Wiley)?;
//! // ... attempt every URL in the batch ...
//! queue.clear(Publisher::Wiley)?;
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::classify::Publisher;

/// Matches URLs inside a queue row; rows holding anything else are skipped.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s]+").unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue file does not exist.
    #[error("queue file not found at {}", path.display())]
    Missing {
        /// Path that was expected to hold the queue.
        path: PathBuf,
    },

    /// Filesystem failure while touching a queue file.
    #[error("failed to {action} queue file {}: {source}", path.display())]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// The queue file involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The queue file holds rows the CSV reader cannot parse.
    #[error("malformed queue file {}: {source}", path.display())]
    Malformed {
        /// The queue file involved.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

/// Directory-level handle over every publisher's queue file.
#[derive(Debug, Clone)]
pub struct DownloadQueue {
    dir: PathBuf,
}

impl DownloadQueue {
    /// Creates a queue handle rooted at `dir`. The directory is created
    /// lazily on first append.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the queue files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the queue file for `publisher`.
    #[must_use]
    pub fn path_for(&self, publisher: Publisher) -> PathBuf {
        self.dir.join(publisher.queue_file_name())
    }

    /// Appends one URL to a publisher's queue, creating the file (and the
    /// queue directory) as needed.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] or [`QueueError::Malformed`] when the
    /// row cannot be written.
    #[instrument(skip(self), fields(publisher = %publisher))]
    pub fn append(&self, publisher: Publisher, url: &str) -> Result<(), QueueError> {
        let path = self.path_for(publisher);
        fs::create_dir_all(&self.dir).map_err(|source| QueueError::Io {
            action: "create directory for",
            path: path.clone(),
            source,
        })?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| QueueError::Io {
                action: "open",
                path: path.clone(),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record([url])
            .and_then(|()| writer.flush().map_err(csv::Error::from))
            .map_err(|source| QueueError::Malformed {
                path: path.clone(),
                source,
            })?;

        debug!(url, path = %path.display(), "queued URL");
        Ok(())
    }

    /// Reads every pending URL for `publisher` without clearing the file.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Missing`] when the queue file does not exist.
    pub fn drain(&self, publisher: Publisher) -> Result<Vec<String>, QueueError> {
        drain_file(&self.path_for(publisher))
    }

    /// Truncates a publisher's queue file. Missing files are fine: there
    /// is nothing to clear.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] when truncation fails.
    pub fn clear(&self, publisher: Publisher) -> Result<(), QueueError> {
        clear_file(&self.path_for(publisher))
    }

    /// Number of pending URLs for `publisher`; a missing file counts as
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Malformed`] when the file exists but cannot
    /// be read.
    pub fn pending_count(&self, publisher: Publisher) -> Result<usize, QueueError> {
        match drain_file(&self.path_for(publisher)) {
            Ok(urls) => Ok(urls.len()),
            Err(QueueError::Missing { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Every publisher whose queue currently holds at least one URL.
    ///
    /// # Errors
    ///
    /// Returns the first read failure encountered.
    pub fn publishers_with_pending(&self) -> Result<Vec<Publisher>, QueueError> {
        let mut pending = Vec::new();
        for publisher in Publisher::QUEUEABLE {
            if self.pending_count(publisher)? > 0 {
                pending.push(publisher);
            }
        }
        Ok(pending)
    }
}

/// Infers the publisher from a queue file named `<slug>_urls.csv`.
#[must_use]
pub fn infer_publisher(path: &Path) -> Option<Publisher> {
    let stem = path.file_stem()?.to_str()?;
    let slug = stem.strip_suffix("_urls")?;
    Publisher::from_slug(slug)
}

/// Reads every URL pending in a queue file, in order.
///
/// Rows are scanned with a URL matcher rather than taken verbatim, so a
/// row holding surrounding junk still yields its URLs and rows holding no
/// URL at all are skipped.
///
/// # Errors
///
/// Returns [`QueueError::Missing`] when the file does not exist and
/// [`QueueError::Malformed`] when it cannot be parsed.
#[instrument]
pub fn drain_file(path: &Path) -> Result<Vec<String>, QueueError> {
    if !path.exists() {
        return Err(QueueError::Missing {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| QueueError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| QueueError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut matched = false;
        for field in record.iter() {
            for found in URL_RE.find_iter(field) {
                urls.push(found.as_str().to_string());
                matched = true;
            }
        }
        if !matched && record.iter().any(|field| !field.trim().is_empty()) {
            debug!(row = ?record, "skipping queue row with no URL");
        }
    }

    debug!(count = urls.len(), "drained queue file");
    Ok(urls)
}

/// Truncates a queue file after its batch has been fully attempted.
/// Missing files are fine: there is nothing to clear.
///
/// # Errors
///
/// Returns [`QueueError::Io`] when truncation fails.
#[instrument]
pub fn clear_file(path: &Path) -> Result<(), QueueError> {
    if !path.exists() {
        return Ok(());
    }
    fs::write(path, "").map_err(|source| QueueError::Io {
        action: "truncate",
        path: path.to_path_buf(),
        source,
    })
}
