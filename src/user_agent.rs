//! Shared User-Agent string for outgoing HTTP fetch traffic.
//!
//! Single source for project URL and UA format so every fetch identifies
//! the tool consistently (good citizenship; RFC 9308).

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce-lab/paperharvest";

/// Default User-Agent for document fetch requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("paperharvest/{version} (academic-research-tool; +{PROJECT_UA_URL})")
}
