//! Search-stage resolver for publishers whose article pages carry a plain
//! PDF anchor.
//!
//! These sites need no click-through: the anchor's `href` is the document
//! URL, so the search flow resolves immediately and workers fetch exactly
//! what was queued. One struct covers all of them; the per-site knowledge
//! is the selector each constructor bakes in.

use async_trait::async_trait;

use crate::browser::BrowserSession;
use crate::classify::Publisher;

use super::utils::resolve_anchor_href;
use super::{ResolveStage, ResolvedDocument, ResolverError, SiteResolver};

/// Search-stage resolver reading a single PDF anchor off the page.
#[derive(Debug)]
pub struct AnchorResolver {
    publisher: Publisher,
    selector: &'static str,
}

impl AnchorResolver {
    /// `HeinOnline` download button group.
    #[must_use]
    pub fn heinonline() -> Self {
        Self {
            publisher: Publisher::HeinOnline,
            selector: "div.btn-group a",
        }
    }

    /// Taylor & Francis PDF link.
    #[must_use]
    pub fn tandfonline() -> Self {
        Self {
            publisher: Publisher::TandfOnline,
            selector: "a.show-pdf",
        }
    }

    /// Springer Link download link.
    #[must_use]
    pub fn springer() -> Self {
        Self {
            publisher: Publisher::Springer,
            selector: "a.c-pdf-download__link",
        }
    }

    /// Brill PDF anchor.
    #[must_use]
    pub fn brill() -> Self {
        Self {
            publisher: Publisher::Brill,
            selector: "a[data-datatype='pdf']",
        }
    }

    /// IEEE Xplore document download action.
    #[must_use]
    pub fn ieee() -> Self {
        Self {
            publisher: Publisher::Ieee,
            selector: "a.stats-document-lh-action-downloadPdf",
        }
    }

    /// `ResearchGate` full-text download button.
    #[must_use]
    pub fn researchgate() -> Self {
        Self {
            publisher: Publisher::ResearchGate,
            selector: "a.js-target-download-btn",
        }
    }

    /// IOP Science article PDF button.
    #[must_use]
    pub fn iop() -> Self {
        Self {
            publisher: Publisher::Iop,
            selector: "a.wd-jnl-art-pdf-button-main",
        }
    }

    /// `GeoScienceWorld` article PDF link.
    #[must_use]
    pub fn geoscienceworld() -> Self {
        Self {
            publisher: Publisher::GeoscienceWorld,
            selector: "a.article-pdfLink",
        }
    }
}

#[async_trait]
impl SiteResolver for AnchorResolver {
    fn publisher(&self) -> Publisher {
        self.publisher
    }

    fn stage(&self) -> ResolveStage {
        ResolveStage::Search
    }

    async fn resolve(
        &self,
        browser: &dyn BrowserSession,
        _url: &str,
    ) -> Result<Option<ResolvedDocument>, ResolverError> {
        let resolved = resolve_anchor_href(browser, self.selector).await?;
        Ok(resolved.map(ResolvedDocument::new))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::browser::{ScriptedElement, ScriptedPage, ScriptedSession};

    use super::*;

    #[test]
    fn test_constructors_bind_expected_publishers() {
        assert_eq!(AnchorResolver::heinonline().publisher(), Publisher::HeinOnline);
        assert_eq!(AnchorResolver::tandfonline().publisher(), Publisher::TandfOnline);
        assert_eq!(AnchorResolver::springer().publisher(), Publisher::Springer);
        assert_eq!(AnchorResolver::brill().publisher(), Publisher::Brill);
        assert_eq!(AnchorResolver::ieee().publisher(), Publisher::Ieee);
        assert_eq!(AnchorResolver::researchgate().publisher(), Publisher::ResearchGate);
        assert_eq!(AnchorResolver::iop().publisher(), Publisher::Iop);
        assert_eq!(
            AnchorResolver::geoscienceworld().publisher(),
            Publisher::GeoscienceWorld
        );
    }

    #[test]
    fn test_all_anchor_resolvers_are_search_stage() {
        assert_eq!(AnchorResolver::springer().stage(), ResolveStage::Search);
        assert_eq!(AnchorResolver::ieee().stage(), ResolveStage::Search);
    }

    #[tokio::test]
    async fn test_resolve_reads_and_absolutizes_anchor() {
        let article = "https://link.springer.com/article/10.1007/s11356-021-1";
        let session = ScriptedSession::new().page(
            article,
            ScriptedPage::new().element(
                ScriptedElement::new("a.c-pdf-download__link")
                    .attr("href", "/content/pdf/10.1007/s11356-021-1.pdf"),
            ),
        );
        session.goto(article).await.unwrap();

        let resolver = AnchorResolver::springer();
        let resolved = resolver.resolve(&session, article).await.unwrap().unwrap();
        assert_eq!(
            resolved.url,
            "https://link.springer.com/content/pdf/10.1007/s11356-021-1.pdf"
        );
        assert_eq!(resolved.suggested_filename, None);
    }

    #[tokio::test]
    async fn test_resolve_missing_anchor_is_none() {
        let session = ScriptedSession::new();
        session
            .goto("https://heinonline.org/HOL/LandingPage?handle=hein.journals/x1")
            .await
            .unwrap();

        let resolver = AnchorResolver::heinonline();
        assert!(resolver
            .resolve(&session, "https://heinonline.org/HOL/LandingPage?handle=hein.journals/x1")
            .await
            .unwrap()
            .is_none());
    }
}
