//! Wiley resolver: the Online Library PDF viewer flow.
//!
//! Wiley article pages hide the PDF link inside a reader that opens in its
//! own context. The download control in that reader's navbar carries the
//! direct PDF href once the reader has loaded.

use async_trait::async_trait;

use crate::browser::BrowserSession;
use crate::classify::Publisher;

use super::utils::resolve_via_new_context;
use super::{ResolveStage, ResolvedDocument, ResolverError, SiteResolver};

const PRIMARY_SELECTOR: &str = "a.pdf-download";
const CONTROL_SELECTOR: &str = "a.navbar-download";

/// Download-stage resolver for Wiley Online Library article pages.
#[derive(Debug)]
pub struct WileyResolver;

impl WileyResolver {
    /// Creates a new `WileyResolver`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for WileyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteResolver for WileyResolver {
    fn publisher(&self) -> Publisher {
        Publisher::Wiley
    }

    fn stage(&self) -> ResolveStage {
        ResolveStage::Download
    }

    async fn resolve(
        &self,
        browser: &dyn BrowserSession,
        _url: &str,
    ) -> Result<Option<ResolvedDocument>, ResolverError> {
        let resolved = resolve_via_new_context(browser, PRIMARY_SELECTOR, CONTROL_SELECTOR).await?;
        Ok(resolved.map(ResolvedDocument::new))
    }
}
