//! `ScienceDirect` resolver: canonical article URLs plus the two-step
//! viewer flow.
//!
//! `ScienceDirect` links come in many shapes (abstract pages, `am` pages,
//! `linkinghub` bounces), but every article carries a PII identifier in its
//! path. Queue rows are normalized to the canonical `abs/pii` form, and the
//! actual PDF URL is only minted inside the viewer context the View PDF
//! button opens, so resolution runs at download time.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::browser::BrowserSession;
use crate::classify::Publisher;

use super::utils::{compile_static_regex, resolve_via_new_context};
use super::{ResolveStage, ResolvedDocument, ResolverError, SiteResolver};

const CANONICAL_BASE_URL: &str = "https://www.sciencedirect.com/science/article/abs/";
const PRIMARY_SELECTOR: &str =
    "a.link-button-primary[aria-label='View PDF. Opens in a new window.']";
const CONTROL_SELECTOR: &str = "[aria-label='Download PDF']";

static PII_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(pii/\w+)"));

/// Reduces any `ScienceDirect` URL variant to its canonical article form,
/// or `None` when the URL carries no PII segment.
pub(super) fn canonical_article_url(url: &str) -> Option<String> {
    PII_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|pii| format!("{CANONICAL_BASE_URL}{}", pii.as_str()))
}

/// Download-stage resolver for `ScienceDirect` article pages.
#[derive(Debug)]
pub struct ScienceDirectResolver;

impl ScienceDirectResolver {
    /// Creates a new `ScienceDirectResolver`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScienceDirectResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteResolver for ScienceDirectResolver {
    fn publisher(&self) -> Publisher {
        Publisher::ScienceDirect
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::browser::{ScriptedElement, ScriptedPage, ScriptedSession};

    use super::*;

    // ==================== Canonical URL Tests ====================

    #[test]
    fn test_canonical_article_url_from_abstract_link() {
        assert_eq!(
            canonical_article_url(
                "https://www.sciencedirect.com/science/article/pii/S0025326X24006726"
            )
            .as_deref(),
            Some("https://www.sciencedirect.com/science/article/abs/pii/S0025326X24006726")
        );
    }

    #[test]
    fn test_canonical_article_url_already_canonical_is_stable() {
        let canonical = "https://www.sciencedirect.com/science/article/abs/pii/S0308597X2100123X";
        assert_eq!(canonical_article_url(canonical).as_deref(), Some(canonical));
    }

    #[test]
    fn test_canonical_article_url_from_linkinghub_bounce() {
        assert_eq!(
            canonical_article_url("https://linkinghub.elsevier.com/retrieve/pii/S096859event")
                .as_deref(),
            Some("https://www.sciencedirect.com/science/article/abs/pii/S096859event")
        );
    }

    #[test]
    fn test_canonical_article_url_without_pii_is_none() {
        assert_eq!(
            canonical_article_url("https://www.sciencedirect.com/browse/journals"),
            None
        );
    }

    // ==================== Resolution Tests ====================

    #[tokio::test]
    async fn test_resolve_reads_download_control_in_viewer() {
        let article = "https://www.sciencedirect.com/science/article/abs/pii/S0025326X24006726";
        let session = ScriptedSession::new()
            .page(
                article,
                ScriptedPage::new().element(
                    ScriptedElement::new(PRIMARY_SELECTOR)
                        .opens("https://www.sciencedirect.com/reader/sd/pii/S0025326X24006726"),
                ),
            )
            .page(
                "https://www.sciencedirect.com/reader/sd/pii/S0025326X24006726",
                ScriptedPage::new().element(ScriptedElement::new(CONTROL_SELECTOR).attr(
                    "href",
                    "/science/article/pii/S0025326X24006726/pdfft?isDTMRedir=true",
                )),
            );
        session.goto(article).await.unwrap();

        let resolver = ScienceDirectResolver::new();
        let resolved = resolver.resolve(&session, article).await.unwrap().unwrap();
        assert_eq!(
            resolved.url,
            "https://www.sciencedirect.com/science/article/pii/S0025326X24006726/pdfft?isDTMRedir=true"
        );
        assert_eq!(resolved.suggested_filename, None);
    }

    #[tokio::test]
    async fn test_resolve_without_view_button_is_none() {
        let article = "https://www.sciencedirect.com/science/article/abs/pii/S0025326X24006726";
        let session = ScriptedSession::new().page(article, ScriptedPage::new());
        session.goto(article).await.unwrap();

        let resolver = ScienceDirectResolver::new();
        assert!(resolver.resolve(&session, article).await.unwrap().is_none());
    }
}
