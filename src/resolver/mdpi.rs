//! MDPI resolver: direct PDF anchor with a derived filename.
//!
//! MDPI pages expose the PDF through a plain anchor, but the download URL
//! ends in `/pdf` rather than a filename, so the article number (the
//! second-to-last path segment) names the file on disk.

use async_trait::async_trait;
use url::Url;

use crate::browser::BrowserSession;
use crate::classify::Publisher;

use super::utils::resolve_anchor_href;
use super::{ResolveStage, ResolvedDocument, ResolverError, SiteResolver};

const PDF_SELECTOR: &str = "a.UD_ArticlePDF";

/// Derives `<article number>.pdf` from an MDPI download URL.
fn filename_from_download_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let article_number = segments.get(segments.len().checked_sub(2)?)?;
    Some(format!("{article_number}.pdf"))
}

/// Download-stage resolver for MDPI article pages.
#[derive(Debug)]
pub struct MdpiResolver;

impl MdpiResolver {
    /// Creates a new `MdpiResolver`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for MdpiResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteResolver for MdpiResolver {
    fn publisher(&self) -> Publisher {
        Publisher::Mdpi
    }

    fn stage(&self) -> ResolveStage {
        ResolveStage::Download
    }

    async fn resolve(
        &self,
        browser: &dyn BrowserSession,
        _url: &str,
    ) -> Result<Option<ResolvedDocument>, ResolverError> {
        let Some(download_url) = resolve_anchor_href(browser, PDF_SELECTOR).await? else {
            return Ok(None);
        };
        Ok(Some(match filename_from_download_url(&download_url) {
            Some(filename) => ResolvedDocument::with_filename(download_url, filename),
            None => ResolvedDocument::new(download_url),
        }))
    }
}
