//! Publisher-specific resolution from article pages to document URLs.
//!
//! Each publisher site buries its PDF behind a different control: a plain
//! anchor with an `href`, a viewer that opens in a second browser context,
//! or a download button whose URL only appears after a click. Resolvers
//! normalize that variety into one question: given a loaded page, what URL
//! should the downloader fetch?
//!
//! # Architecture
//!
//! - [`SiteResolver`] - Async trait a per-publisher resolver implements
//! - [`ResolverRegistry`] - Publisher-keyed collection of resolvers
//! - [`ResolveStage`] - Whether a publisher resolves during search or download
//! - [`ResolvedDocument`] - A resolved document URL plus optional filename hint
//! - [`ScienceDirectResolver`] / [`WileyResolver`] - Two-step viewer resolvers
//! - [`MdpiResolver`] - Deferred single-anchor resolver with filename derivation
//! - [`AnchorResolver`] - Shared search-stage resolver for plain-anchor sites
//! - [`GenericResolver`] - Fallback scan for unrecognized pages

mod anchor;
mod generic;
mod mdpi;
mod registry;
mod sciencedirect;
mod utils;
mod wiley;

pub use anchor::AnchorResolver;
pub use generic::GenericResolver;
pub use mdpi::MdpiResolver;
pub use registry::ResolverRegistry;
pub use sciencedirect::ScienceDirectResolver;
pub use wiley::WileyResolver;

use async_trait::async_trait;
use thiserror::Error;

use crate::browser::{BrowserError, BrowserSession};
use crate::classify::Publisher;

/// Builds the registry wired with every supported publisher resolver.
///
/// Registration order is deterministic: interactive viewer publishers
/// first, then the plain-anchor sites, then the generic fallback.
#[must_use]
pub fn build_default_registry() -> ResolverRegistry {
    let mut registry = ResolverRegistry::new();

    registry.register(Box::new(ScienceDirectResolver::new()));
    registry.register(Box::new(WileyResolver::new()));
    registry.register(Box::new(MdpiResolver::new()));

    registry.register(Box::new(AnchorResolver::heinonline()));
    registry.register(Box::new(AnchorResolver::tandfonline()));
    registry.register(Box::new(AnchorResolver::springer()));
    registry.register(Box::new(AnchorResolver::brill()));
    registry.register(Box::new(AnchorResolver::ieee()));
    registry.register(Box::new(AnchorResolver::researchgate()));
    registry.register(Box::new(AnchorResolver::iop()));
    registry.register(Box::new(AnchorResolver::geoscienceworld()));

    registry.register(Box::new(GenericResolver::new()));
    registry
}

/// When a publisher's resolution work happens.
///
/// Search-stage publishers expose a scrapable link on the article page, so
/// the search flow resolves immediately and queues the document URL itself.
/// Download-stage publishers need click-through interaction against a live
/// page, so the queue holds article URLs and workers resolve at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    /// Resolved while walking search results; queues hold document URLs.
    Search,
    /// Resolved by the download worker; queues hold article page URLs.
    Download,
}

/// A resolved document: the URL to fetch and an optional filename hint for
/// sites whose download URLs carry no useful name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    /// The URL the downloader should fetch.
    pub url: String,
    /// Preferred on-disk filename, when the site implies one.
    pub suggested_filename: Option<String>,
}

impl ResolvedDocument {
    /// Creates a resolved document with no filename hint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            suggested_filename: None,
        }
    }

    /// Creates a resolved document with a filename hint.
    #[must_use]
    pub fn with_filename(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            suggested_filename: Some(filename.into()),
        }
    }
}

/// Errors that can occur during publisher resolution.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The browser session failed underneath the resolver.
    #[error("browser interaction failed: {0}")]
    Browser(#[from] BrowserError),

    /// The URL cannot be reduced to a queueable form for its publisher.
    #[error("cannot derive a queueable URL from '{url}': {reason}")]
    UnqueueableUrl {
        /// The offending URL.
        url: String,
        /// Why no queueable form exists.
        reason: String,
    },
}

/// Returns the URL that should be written to a publisher's queue for a
/// link discovered in search results.
///
/// Most publishers queue the link as-is. `ScienceDirect` links are first
/// reduced to their canonical article form so that every variant of the
/// same article dedupes to one queue row.
///
/// # Errors
///
/// Returns [`ResolverError::UnqueueableUrl`] when a `ScienceDirect` link
/// carries no article identifier; callers should skip the link.
pub fn canonical_queue_url(publisher: Publisher, url: &str) -> Result<String, ResolverError> {
    match publisher {
        Publisher::ScienceDirect => sciencedirect::canonical_article_url(url).ok_or_else(|| {
            ResolverError::UnqueueableUrl {
                url: url.to_string(),
                reason: "no article identifier (pii) in URL".to_string(),
            }
        }),
        _ => Ok(url.to_string()),
    }
}

/// Trait implemented by every per-publisher resolver.
///
/// The caller is responsible for navigation: `resolve` scans the page the
/// browser session currently has loaded. The `url` argument is the page's
/// nominal address, used for deriving canonical forms and filename hints.
///
/// Returning `Ok(None)` means the page carries no resolvable document; it
/// is a soft outcome the caller logs and moves past.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn SiteResolver>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required for the registry pattern.
#[async_trait]
pub trait SiteResolver: Send + Sync {
    /// The publisher this resolver handles.
    fn publisher(&self) -> Publisher;

    /// When this publisher's resolution runs.
    fn stage(&self) -> ResolveStage;

    /// Scans the currently loaded page for a downloadable document.
    async fn resolve(
        &self,
        browser: &dyn BrowserSession,
        url: &str,
    ) -> Result<Option<ResolvedDocument>, ResolverError>;
}
