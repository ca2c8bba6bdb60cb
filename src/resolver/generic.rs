//! Generic fallback resolver for unrecognized pages.
//!
//! When a search result leads somewhere no publisher resolver claims, the
//! page may still link a PDF directly. The scan is two-tiered: any anchor
//! whose `href` ends in `.pdf`, then the conventional `pdf-download-link`
//! class some repositories use.

use async_trait::async_trait;

use crate::browser::BrowserSession;
use crate::classify::Publisher;

use super::utils::resolve_anchor_href;
use super::{ResolveStage, ResolvedDocument, ResolverError, SiteResolver};

const DIRECT_PDF_SELECTOR: &str = "a[href$='.pdf']";
const DOWNLOAD_CLASS_SELECTOR: &str = "a.pdf-download-link";

/// Fallback resolver scanning any page for a direct PDF link.
#[derive(Debug)]
pub struct GenericResolver;

impl GenericResolver {
    /// Creates a new `GenericResolver`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenericResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteResolver for GenericResolver {
    fn publisher(&self) -> Publisher {
        Publisher::Generic
    }

    fn stage(&self) -> ResolveStage {
        ResolveStage::Search
    }

    async fn resolve(
        &self,
        browser: &dyn BrowserSession,
        _url: &str,
    ) -> Result<Option<ResolvedDocument>, ResolverError> {
        if let Some(url) = resolve_anchor_href(browser, DIRECT_PDF_SELECTOR).await? {
            return Ok(Some(ResolvedDocument::new(url)));
        }
        let resolved = resolve_anchor_href(browser, DOWNLOAD_CLASS_SELECTOR).await?;
        Ok(resolved.map(ResolvedDocument::new))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::browser::{ScriptedElement, ScriptedPage, ScriptedSession};

    use super::*;

    #[tokio::test]
    async fn test_direct_pdf_anchor_wins_over_download_class() {
        let page = "https://repository.example/record/42";
        let session = ScriptedSession::new().page(
            page,
            ScriptedPage::new()
                .element(
                    ScriptedElement::new(DIRECT_PDF_SELECTOR)
                        .attr("href", "https://repository.example/files/42.pdf"),
                )
                .element(
                    ScriptedElement::new(DOWNLOAD_CLASS_SELECTOR)
                        .attr("href", "https://repository.example/download/42"),
                ),
        );
        session.goto(page).await.unwrap();

        let resolver = GenericResolver::new();
        let resolved = resolver.resolve(&session, page).await.unwrap().unwrap();
        assert_eq!(resolved.url, "https://repository.example/files/42.pdf");
    }

    #[tokio::test]
    async fn test_falls_back_to_download_class_anchor() {
        let page = "https://repository.example/record/42";
        let session = ScriptedSession::new().page(
            page,
            ScriptedPage::new().element(
                ScriptedElement::new(DOWNLOAD_CLASS_SELECTOR).attr("href", "/download/42"),
            ),
        );
        session.goto(page).await.unwrap();

        let resolver = GenericResolver::new();
        let resolved = resolver.resolve(&session, page).await.unwrap().unwrap();
        assert_eq!(resolved.url, "https://repository.example/download/42");
    }

    #[tokio::test]
    async fn test_page_with_no_pdf_link_is_none() {
        let session = ScriptedSession::new();
        session.goto("https://blog.example/post").await.unwrap();

        let resolver = GenericResolver::new();
        assert!(resolver
            .resolve(&session, "https://blog.example/post")
            .await
            .unwrap()
            .is_none());
    }
}
