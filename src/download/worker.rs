//! Queue-driven batch downloader for a single publisher.
//!
//! A worker owns one publisher's queue file. It drains every URL from the
//! file, fetches each document (resolving article pages through a browser
//! session for publishers that need one), and clears the file only after
//! the whole batch has been attempted. Re-running an interrupted worker
//! therefore re-attempts the full batch rather than losing rows;
//! re-downloads overwrite in place, so the repeat work is wasted time,
//! never corrupted output.
//!
//! Individual fetch failures do NOT abort the batch. They are logged and
//! counted, and processing moves to the next row.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::client::{DownloadClient, SavedDocument};
use super::error::DownloadError;
use super::filename::{fallback_filename, filename_from_url, remove_numbered_duplicates};
use crate::browser::BrowserSession;
use crate::classify::{Publisher, classify};
use crate::pacing::PacingProfile;
use crate::queue::{QueueError, clear_file, drain_file};
use crate::resolver::{
    ResolveStage, ResolverError, ResolverRegistry, SiteResolver, build_default_registry,
};

/// Errors that abort a worker run outright. Per-row fetch failures are
/// soft and reported through [`WorkerReport`] instead.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Queue file could not be read or cleared.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The publisher resolves documents from live pages, but no browser
    /// session was attached.
    #[error("publisher {publisher} requires a browser session for document resolution")]
    BrowserRequired {
        /// The publisher whose resolution needs a browser.
        publisher: Publisher,
    },

    /// The output directory could not be created.
    #[error("failed to prepare output directory {}: {source}", path.display())]
    OutputDir {
        /// The directory that could not be prepared.
        path: PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Outcome counts from one worker batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    /// Rows taken from the queue file, including skipped foreign rows.
    pub attempted: usize,
    /// Rows that produced a saved document.
    pub succeeded: usize,
}

impl WorkerReport {
    /// Rows that were attempted but produced no document.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.succeeded)
    }
}

/// Why one queue row produced no document. Logged per row; never fatal.
#[derive(Debug, Error)]
enum RowFailure {
    #[error("row belongs to {observed}, not {expected}")]
    Foreign {
        observed: Publisher,
        expected: Publisher,
    },

    #[error("no document link resolved on page")]
    NoDocument,

    #[error("browser session required but not attached")]
    BrowserMissing,

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Batch downloader bound to one publisher's queue file.
///
/// # Example
///
/// ```no_run
/// use paperharvest_core::classify::Publisher;
/// use paperharvest_core::download::DownloadWorker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let worker = DownloadWorker::new(
///     Publisher::Springer,
///     "./springer_urls.csv",
///     "./pdf/north_sea_wrecks",
/// );
/// let report = worker.run().await?;
/// println!("{}/{} downloaded", report.succeeded, report.attempted);
/// # Ok(())
/// # }
/// ```
pub struct DownloadWorker {
    publisher: Publisher,
    queue_path: PathBuf,
    output_dir: PathBuf,
    client: DownloadClient,
    registry: ResolverRegistry,
    browser: Option<Arc<dyn BrowserSession>>,
    pacing: PacingProfile,
}

impl DownloadWorker {
    /// Creates a worker with the default client, resolver registry, and
    /// production pacing. Publishers that resolve documents from live
    /// pages additionally need [`with_browser`](Self::with_browser).
    #[must_use]
    pub fn new(
        publisher: Publisher,
        queue_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            publisher,
            queue_path: queue_path.into(),
            output_dir: output_dir.into(),
            client: DownloadClient::new(),
            registry: build_default_registry(),
            browser: None,
            pacing: PacingProfile::standard(),
        }
    }

    /// Replaces the HTTP client, consuming and returning the worker.
    #[must_use]
    pub fn with_client(mut self, client: DownloadClient) -> Self {
        self.client = client;
        self
    }

    /// Replaces the resolver registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ResolverRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Attaches the browser session used for live-page resolution.
    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn BrowserSession>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Replaces the pacing profile.
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingProfile) -> Self {
        self.pacing = pacing;
        self
    }

    /// Drains the queue file, fetches every row, then clears the file.
    ///
    /// The clear happens only after the entire batch has been attempted,
    /// so an interrupted run leaves the queue intact for a retry. After
    /// the batch, numbered duplicate files (`name(1).pdf`) left by earlier
    /// tooling are swept from the output directory.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Queue`] when the queue file is missing or
    /// unreadable, [`WorkerError::BrowserRequired`] when the publisher
    /// needs a browser session and none was attached, and
    /// [`WorkerError::OutputDir`] when the output directory cannot be
    /// created. Per-row fetch failures are logged and counted, not
    /// returned.
    #[instrument(
        skip(self),
        fields(publisher = %self.publisher, queue = %self.queue_path.display())
    )]
    pub async fn run(&self) -> Result<WorkerReport, WorkerError> {
        if self.registry.stage_of(self.publisher) == Some(ResolveStage::Download)
            && self.browser.is_none()
        {
            return Err(WorkerError::BrowserRequired {
                publisher: self.publisher,
            });
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| WorkerError::OutputDir {
                path: self.output_dir.clone(),
                source: e,
            })?;

        let urls = drain_file(&self.queue_path)?;
        info!(rows = urls.len(), "starting queue batch");

        let mut report = WorkerReport::default();
        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                self.pacing.per_result.wait().await;
            }
            report.attempted += 1;
            match self.process_row(url).await {
                Ok(saved) => {
                    report.succeeded += 1;
                    debug!(url = %url, path = %saved.path.display(), "queue row downloaded");
                }
                Err(failure) => {
                    warn!(url = %url, error = %failure, "queue row failed");
                }
            }
        }

        // The whole batch was attempted; now the queue rows may go.
        clear_file(&self.queue_path)?;

        if let Err(error) = remove_numbered_duplicates(&self.output_dir) {
            warn!(error = %error, "numbered-duplicate sweep failed");
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed(),
            "queue batch finished"
        );
        Ok(report)
    }

    /// Routes one queue row to the right fetch strategy.
    async fn process_row(&self, url: &str) -> Result<SavedDocument, RowFailure> {
        let observed = classify(url);

        // A row that is itself a document file needs no resolution no
        // matter which queue it sits in.
        if observed == Publisher::DirectFile {
            debug!(url = %url, "row points straight at a document file");
            return Ok(self.client.fetch_document(url, &self.output_dir, None).await?);
        }

        if observed != self.publisher {
            return Err(RowFailure::Foreign {
                observed,
                expected: self.publisher,
            });
        }

        match self.registry.for_publisher(self.publisher) {
            Some(resolver) if resolver.stage() == ResolveStage::Download => {
                let Some(browser) = self.browser.as_deref() else {
                    return Err(RowFailure::BrowserMissing);
                };
                self.resolve_and_fetch(browser, resolver, url).await
            }
            _ => {
                // Queues for the remaining publishers hold document URLs
                // resolved during search; fetch them as-is.
                let preferred = filename_from_url(url)
                    .unwrap_or_else(|| fallback_filename(self.publisher));
                Ok(self
                    .client
                    .fetch_document(url, &self.output_dir, Some(&preferred))
                    .await?)
            }
        }
    }

    /// Navigates to an article page, resolves the document link there, and
    /// fetches it.
    async fn resolve_and_fetch(
        &self,
        browser: &dyn BrowserSession,
        resolver: &dyn SiteResolver,
        url: &str,
    ) -> Result<SavedDocument, RowFailure> {
        browser.goto(url).await.map_err(ResolverError::from)?;
        self.pacing.page_load.wait().await;

        let Some(document) = resolver.resolve(browser, url).await? else {
            return Err(RowFailure::NoDocument);
        };

        // Resolvers that imply a name (MDPI's article number) win; otherwise
        // the response's Content-Disposition or the URL itself names the file.
        Ok(self
            .client
            .fetch_document(
                &document.url,
                &self.output_dir,
                document.suggested_filename.as_deref(),
            )
            .await?)
    }
}

impl fmt::Debug for DownloadWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadWorker")
            .field("publisher", &self.publisher)
            .field("queue_path", &self.queue_path)
            .field("output_dir", &self.output_dir)
            .field("has_browser", &self.browser.is_some())
            .finish_non_exhaustive()
    }
}
