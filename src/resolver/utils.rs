//! Shared utilities for resolver modules: URL absolutization, static regex
//! compilation, and the two-step viewer resolution flow.

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::browser::{BrowserError, BrowserSession, DEFAULT_WAIT};

use super::ResolverError;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to `https:...`; otherwise joins with `base_url`.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}

/// Resolves an anchor's href on the current page into an absolute URL.
///
/// Returns `Ok(None)` when the selector matches nothing, the matched
/// element has no href, or the href cannot be absolutized.
pub async fn resolve_anchor_href(
    browser: &dyn BrowserSession,
    selector: &str,
) -> Result<Option<String>, ResolverError> {
    let Some(anchor) = browser.find(selector).await? else {
        return Ok(None);
    };
    let Some(href) = browser.attribute(&anchor, "href").await? else {
        return Ok(None);
    };
    let current = browser.current_url().await?;
    let Ok(base) = Url::parse(&current) else {
        return Ok(Some(href));
    };
    Ok(absolutize_url(&href, &base))
}

/// Runs the two-step viewer flow shared by publishers whose PDF link only
/// exists inside a second browser context.
///
/// Clicks `primary_selector`, waits for a new context to open, focuses it,
/// waits for `control_selector` to appear there, and reads that control's
/// `href`. Extra contexts are always closed before returning so the session
/// is reusable for the next item.
///
/// Any missing element or expired wait is a soft `Ok(None)`; only session
/// failures propagate as errors.
pub async fn resolve_via_new_context(
    browser: &dyn BrowserSession,
    primary_selector: &str,
    control_selector: &str,
) -> Result<Option<String>, ResolverError> {
    let outcome = viewer_flow(browser, primary_selector, control_selector).await;
    // Cleanup runs on every path, including errors.
    let cleanup = browser.close_extra_contexts().await;
    let resolved = outcome?;
    cleanup?;
    Ok(resolved)
}

async fn viewer_flow(
    browser: &dyn BrowserSession,
    primary_selector: &str,
    control_selector: &str,
) -> Result<Option<String>, ResolverError> {
    let primary = match browser.wait_for_element(primary_selector, DEFAULT_WAIT).await {
        Ok(element) => element,
        Err(BrowserError::Timeout { .. }) => {
            debug!(selector = primary_selector, "viewer control not present on page");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    browser.click(&primary).await?;

    match browser.wait_for_context_count(2, DEFAULT_WAIT).await {
        Ok(()) => {}
        Err(BrowserError::Timeout { .. }) => {
            debug!("click did not open a viewer context");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    browser.focus_latest_context().await?;

    let control = match browser.wait_for_element(control_selector, DEFAULT_WAIT).await {
        Ok(element) => element,
        Err(BrowserError::Timeout { .. }) => {
            debug!(selector = control_selector, "viewer never signalled ready");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let Some(href) = browser.attribute(&control, "href").await? else {
        debug!(selector = control_selector, "download control carries no href");
        return Ok(None);
    };

    let viewer_url = browser.current_url().await?;
    let resolved = match Url::parse(&viewer_url) {
        Ok(base) => absolutize_url(&href, &base),
        Err(_) => Some(href),
    };
    Ok(resolved)
}
