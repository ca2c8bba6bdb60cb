//! Browser automation capability boundary.
//!
//! The pipeline never talks to a real browser directly. Everything that
//! needs page interaction (the search controller and the interactive
//! resolvers) works against the [`BrowserSession`] trait: load a page,
//! locate elements by CSS selector, read attributes, click, and manage
//! the small amount of tab/context state the two-step resolvers need.
//!
//! Two implementations ship with the crate:
//! - [`SidecarBrowser`] drives an external automation process over a
//!   line-delimited JSON protocol (any Playwright/WebDriver wrapper that
//!   speaks the protocol works).
//! - [`ScriptedSession`] is a deterministic in-memory session for tests
//!   and offline rehearsal of publisher flows.
//!
//! A session failing to start is fatal to its process; individual
//! operations failing after that are soft, per-item conditions handled by
//! the callers.

mod scripted;
mod sidecar;

use std::time::Duration;

use async_trait::async_trait;

pub use scripted::{ScriptedElement, ScriptedPage, ScriptedSession};
pub use sidecar::SidecarBrowser;

/// Default bound on element waits, mirroring the explicit waits used on
/// publisher pages.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(20);

/// Opaque reference to an element located in the current page.
///
/// Handles are only meaningful for the session that produced them and only
/// until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Failures surfaced by a browser session.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// The driver process could not be started or did not complete the
    /// protocol handshake. Fatal to the enclosing run.
    #[error("failed to launch browser driver `{command}`: {reason}")]
    Launch { command: String, reason: String },

    /// The driver process went away mid-session.
    #[error("browser driver exited unexpectedly")]
    Closed,

    /// The driver replied with something the protocol does not allow.
    #[error("browser driver protocol error: {0}")]
    Protocol(String),

    /// A bounded wait elapsed without its condition becoming true.
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    /// The driver reported an operation-level failure (bad navigation,
    /// stale element, script error inside the page).
    #[error("browser operation failed: {0}")]
    Operation(String),

    #[error("browser driver io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser driver sent malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One interactive browser session.
///
/// All operations act on the session's current context (tab). Within a
/// session, callers interact strictly sequentially; a session is never
/// shared across concurrently running units of work.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates the current context to `url` and waits for the load.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// URL the current context is on after any redirects.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// First element matching `selector`, or `None` when absent.
    ///
    /// Absence is the soft `NotFound` the resolution policies are built
    /// around; it is not an error.
    async fn find(&self, selector: &str) -> Result<Option<ElementHandle>, BrowserError>;

    /// All elements matching `selector`, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError>;

    /// Value of attribute `name` on `element`, or `None` when the
    /// attribute is not present.
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Clicks `element`.
    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError>;

    /// Waits up to `timeout` for `selector` to match, returning the
    /// element. Elapsing yields [`BrowserError::Timeout`].
    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError>;

    /// Waits up to `timeout` for the session to have at least `count`
    /// open contexts (tabs/windows).
    async fn wait_for_context_count(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Makes the most recently opened context current.
    async fn focus_latest_context(&self) -> Result<(), BrowserError>;

    /// Closes every context except the first and makes the first current.
    async fn close_extra_contexts(&self) -> Result<(), BrowserError>;
}
