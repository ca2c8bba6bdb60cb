//! Result-page walking and per-link routing.
//!
//! The controller drives one engine session for one keyword. Every result
//! link is classified and routed: document files download on the spot,
//! article pages for publishers with a scrapable link resolve right away
//! and queue the document URL, and the interactive publishers queue their
//! article URL for a later worker pass.
//!
//! Per-link and per-page failures are soft: they are logged and the walk
//! moves on. The one exception is a bot challenge from the engine itself,
//! which aborts the run before the session gets blocked outright.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::browser::{BrowserError, BrowserSession};
use crate::classify::{Publisher, classify};
use crate::download::{DownloadClient, DownloadError};
use crate::pacing::PacingProfile;
use crate::paths::keyword_dir;
use crate::queue::{DownloadQueue, QueueError};
use crate::resolver::{
    ResolveStage, ResolverError, ResolverRegistry, SiteResolver, build_default_registry,
    canonical_queue_url,
};

use super::engine::SearchEngine;

/// Substring of a results-page URL that marks an automated-traffic
/// challenge page.
const BOT_CHALLENGE_MARKER: &str = "captcha";

/// Errors that abort a search run outright. Per-link and per-page failures
/// are soft and surface only in logs and [`SearchSummary`] counts.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The engine served a challenge page instead of results.
    #[error("bot challenge at {url}; aborting search")]
    BotChallenge {
        /// URL the browser landed on.
        url: String,
    },
}

/// Outcome counts from one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchSummary {
    /// Result pages that were loaded and scanned.
    pub pages: usize,
    /// Result links inspected across all pages.
    pub results: usize,
    /// Documents downloaded directly during the walk.
    pub downloaded: usize,
    /// URLs appended to publisher queues.
    pub queued: usize,
}

/// Why one result link produced neither a download nor a queue row.
/// Logged per link; never fatal.
#[derive(Debug, Error)]
enum LinkFailure {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// What handling one result link produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Downloaded,
    Queued,
    Skipped,
}

/// Keyword search driver bound to one engine and one browser session.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use paperharvest_core::browser::SidecarBrowser;
/// use paperharvest_core::search::{SearchController, SearchEngine};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let browser = Arc::new(SidecarBrowser::launch("playwright-driver").await?);
/// let controller = SearchController::new(SearchEngine::Scholar, browser);
/// let summary = controller.run("north sea shipwreck oil").await?;
/// println!("{} downloaded, {} queued", summary.downloaded, summary.queued);
/// # Ok(())
/// # }
/// ```
pub struct SearchController {
    engine: SearchEngine,
    browser: Arc<dyn BrowserSession>,
    base_url: String,
    max_pages: usize,
    output_root: PathBuf,
    client: DownloadClient,
    registry: ResolverRegistry,
    queue: DownloadQueue,
    pacing: PacingProfile,
}

impl SearchController {
    /// Creates a controller with the engine's default base URL and page
    /// cap, the default client and resolver registry, queues in the
    /// current directory, downloads under `./pdf`, and production pacing.
    #[must_use]
    pub fn new(engine: SearchEngine, browser: Arc<dyn BrowserSession>) -> Self {
        Self {
            engine,
            browser,
            base_url: engine.default_base_url().to_string(),
            max_pages: engine.default_max_pages(),
            output_root: PathBuf::from("./pdf"),
            client: DownloadClient::new(),
            registry: build_default_registry(),
            queue: DownloadQueue::new("."),
            pacing: PacingProfile::standard(),
        }
    }

    /// Points the engine at a different base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides how many result pages the run walks.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Changes the root under which per-keyword download directories live.
    #[must_use]
    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    /// Replaces the HTTP client used for immediate downloads.
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

    /// Replaces the queue the run appends to.
    #[must_use]
    pub fn with_queue(mut self, queue: DownloadQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Replaces the pacing profile.
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingProfile) -> Self {
        self.pacing = pacing;
        self
    }

    /// Walks the engine's result pages for `keyword`, downloading and
    /// queueing as links allow.
    ///
    /// A failing link or even a whole failing page does NOT abort the run;
    /// both are logged and the walk continues.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::BotChallenge`] when the engine answers with
    /// a challenge page. Work completed before the challenge stands:
    /// already-downloaded files and already-queued URLs are kept.
    #[instrument(skip(self), fields(engine = %self.engine))]
    pub async fn run(&self, keyword: &str) -> Result<SearchSummary, SearchError> {
        let output_dir = keyword_dir(&self.output_root, keyword);
        let mut summary = SearchSummary::default();

        for page in 0..self.max_pages {
            let results_url = self.engine.results_url(&self.base_url, keyword, page);
            info!(page, url = %results_url, "loading results page");
            if let Err(error) = self.browser.goto(&results_url).await {
                warn!(page, error = %error, "results page failed to load");
                continue;
            }
            self.pacing.page_load.wait().await;
            self.check_bot_challenge().await?;

            let links = match self.collect_result_links().await {
                Ok(links) => links,
                Err(error) => {
                    warn!(page, error = %error, "could not read result links");
                    continue;
                }
            };
            summary.pages += 1;
            debug!(page, links = links.len(), "scanned results page");

            for url in &links {
                summary.results += 1;
                match self.handle_result(url, &output_dir).await {
                    Ok(LinkOutcome::Downloaded) => summary.downloaded += 1,
                    Ok(LinkOutcome::Queued) => summary.queued += 1,
                    Ok(LinkOutcome::Skipped) => {}
                    Err(failure) => {
                        warn!(url = %url, error = %failure, "result link failed");
                    }
                }
            }
        }

        info!(
            pages = summary.pages,
            results = summary.results,
            downloaded = summary.downloaded,
            queued = summary.queued,
            "search finished"
        );
        Ok(summary)
    }

    /// Errors when the browser sits on a challenge page instead of results.
    async fn check_bot_challenge(&self) -> Result<(), SearchError> {
        match self.browser.current_url().await {
            Ok(url) if url.to_lowercase().contains(BOT_CHALLENGE_MARKER) => {
                Err(SearchError::BotChallenge { url })
            }
            Ok(_) => Ok(()),
            Err(error) => {
                debug!(error = %error, "could not read current URL for challenge check");
                Ok(())
            }
        }
    }

    /// Hrefs of every result link on the loaded page, in document order.
    ///
    /// Collected up front because handling a result may navigate away,
    /// which would stale the remaining element handles.
    async fn collect_result_links(&self) -> Result<Vec<String>, BrowserError> {
        let elements = self.browser.find_all(self.engine.result_selector()).await?;
        let mut links = Vec::with_capacity(elements.len());
        for element in &elements {
            if let Some(href) = self.browser.attribute(element, "href").await?
                && !href.is_empty()
            {
                links.push(href);
            }
        }
        Ok(links)
    }

    /// Routes one result link according to engine and publisher.
    async fn handle_result(
        &self,
        url: &str,
        output_dir: &Path,
    ) -> Result<LinkOutcome, LinkFailure> {
        let publisher = classify(url);
        if publisher == Publisher::DirectFile {
            return self.download_now(url, output_dir, None).await;
        }
        match self.engine {
            SearchEngine::Google => self.route_publisher(publisher, url).await,
            SearchEngine::Scholar => self.follow_and_route(url, output_dir).await,
        }
    }

    /// Google flow: raw hrefs route straight from classification. Links
    /// that match no publisher are chrome or unrelated hits and are left
    /// alone entirely, with no navigation.
    async fn route_publisher(
        &self,
        publisher: Publisher,
        url: &str,
    ) -> Result<LinkOutcome, LinkFailure> {
        if !publisher.is_queueable() {
            debug!(url = %url, "ignoring unmatched result link");
            return Ok(LinkOutcome::Skipped);
        }
        match self.registry.for_publisher(publisher) {
            Some(resolver) if resolver.stage() == ResolveStage::Download => {
                self.enqueue(publisher, url)
            }
            Some(resolver) => self.resolve_on_site(resolver, url).await,
            None => {
                debug!(publisher = %publisher, "no resolver registered; queueing raw link");
                self.enqueue(publisher, url)
            }
        }
    }

    /// Scholar flow: navigate first, then route by whatever URL the
    /// browser actually landed on, since Scholar results often pass
    /// through redirects before reaching the publisher.
    async fn follow_and_route(
        &self,
        url: &str,
        output_dir: &Path,
    ) -> Result<LinkOutcome, LinkFailure> {
        self.browser.goto(url).await?;
        self.pacing.page_load.wait().await;

        let landing = match self.browser.current_url().await {
            Ok(landing) => landing,
            Err(error) => {
                debug!(url = %url, error = %error, "could not read landing URL; using the link");
                url.to_string()
            }
        };

        let publisher = classify(&landing);
        if publisher == Publisher::DirectFile {
            return self.download_now(&landing, output_dir, None).await;
        }
        if publisher.is_queueable() {
            return match self.registry.for_publisher(publisher) {
                Some(resolver) if resolver.stage() == ResolveStage::Download => {
                    self.enqueue(publisher, &landing)
                }
                // Already on the article page; resolve without re-navigating.
                Some(resolver) => self.resolve_here(resolver, &landing).await,
                None => self.enqueue(publisher, &landing),
            };
        }
        self.scan_generic_page(&landing, output_dir).await
    }

    /// Appends the queueable form of `url` to its publisher's queue.
    fn enqueue(&self, publisher: Publisher, url: &str) -> Result<LinkOutcome, LinkFailure> {
        match canonical_queue_url(publisher, url) {
            Ok(queue_url) => {
                self.queue.append(publisher, &queue_url)?;
                info!(publisher = %publisher, url = %queue_url, "queued for download");
                Ok(LinkOutcome::Queued)
            }
            Err(error) => {
                warn!(url = %url, error = %error, "link is not queueable; skipping");
                Ok(LinkOutcome::Skipped)
            }
        }
    }

    /// Navigates to a publisher article page, lets it settle, and queues
    /// the document URL its resolver reads off the page.
    async fn resolve_on_site(
        &self,
        resolver: &dyn SiteResolver,
        url: &str,
    ) -> Result<LinkOutcome, LinkFailure> {
        self.browser.goto(url).await?;
        self.pacing.settle.wait().await;
        let outcome = self.resolve_here(resolver, url).await;
        self.pacing.per_result.wait().await;
        outcome
    }

    /// Resolves on the already-loaded page and queues the document URL.
    async fn resolve_here(
        &self,
        resolver: &dyn SiteResolver,
        url: &str,
    ) -> Result<LinkOutcome, LinkFailure> {
        let publisher = resolver.publisher();
        match resolver.resolve(self.browser.as_ref(), url).await? {
            Some(document) => {
                self.queue.append(publisher, &document.url)?;
                info!(publisher = %publisher, url = %document.url, "queued resolved document");
                Ok(LinkOutcome::Queued)
            }
            None => {
                warn!(publisher = %publisher, url = %url, "no document link found on page");
                Ok(LinkOutcome::Skipped)
            }
        }
    }

    /// Last resort for pages no publisher claims: scan for a PDF link and
    /// download it on the spot.
    async fn scan_generic_page(
        &self,
        url: &str,
        output_dir: &Path,
    ) -> Result<LinkOutcome, LinkFailure> {
        let Some(resolver) = self.registry.for_publisher(Publisher::Generic) else {
            debug!(url = %url, "no generic resolver registered");
            return Ok(LinkOutcome::Skipped);
        };
        match resolver.resolve(self.browser.as_ref(), url).await? {
            Some(document) => {
                self.download_now(
                    &document.url,
                    output_dir,
                    document.suggested_filename.as_deref(),
                )
                .await
            }
            None => {
                info!(url = %url, "no PDF link found on page");
                Ok(LinkOutcome::Skipped)
            }
        }
    }

    /// Fetches a document URL straight to the keyword directory. The
    /// politeness wait runs whether or not the fetch succeeded, since the
    /// server was hit either way.
    async fn download_now(
        &self,
        url: &str,
        output_dir: &Path,
        preferred_filename: Option<&str>,
    ) -> Result<LinkOutcome, LinkFailure> {
        let outcome = self
            .client
            .fetch_document(url, output_dir, preferred_filename)
            .await;
        self.pacing.per_result.wait().await;
        let saved = outcome?;
        debug!(url = %url, path = %saved.path.display(), "search result downloaded");
        Ok(LinkOutcome::Downloaded)
    }
}

impl fmt::Debug for SearchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchController")
            .field("engine", &self.engine)
            .field("base_url", &self.base_url)
            .field("max_pages", &self.max_pages)
            .field("output_root", &self.output_root)
            .finish_non_exhaustive()
    }
}
