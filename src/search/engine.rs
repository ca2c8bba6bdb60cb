//! Search-engine definitions: results URLs, page caps, result selectors.
//!
//! Each engine formats its results URL differently and marks result links
//! with different markup, so the controller asks this enum instead of
//! hard-coding either. The base URL is a parameter so tests can point an
//! engine at scripted pages.

use std::fmt;

/// A supported web search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngine {
    /// Plain Google web search, queried with a `filetype:pdf` filter.
    Google,
    /// Google Scholar, whose results are article landing pages.
    Scholar,
}

impl SearchEngine {
    /// Production base URL for this engine.
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            SearchEngine::Google => "https://www.google.com",
            SearchEngine::Scholar => "https://scholar.google.com",
        }
    }

    /// How many result pages a run walks by default.
    ///
    /// Scholar rate-limits much harder than plain search, so it stops
    /// after a single page.
    #[must_use]
    pub fn default_max_pages(self) -> usize {
        match self {
            SearchEngine::Google => 2,
            SearchEngine::Scholar => 1,
        }
    }

    /// CSS selector matching result links on a results page.
    ///
    /// Google mixes result anchors with navigation chrome, so every anchor
    /// is read and non-publisher links fall out at classification. Scholar
    /// wraps each result title in an `h3.gs_rt`.
    #[must_use]
    pub fn result_selector(self) -> &'static str {
        match self {
            SearchEngine::Google => "a",
            SearchEngine::Scholar => "h3.gs_rt a",
        }
    }

    /// URL of one results page. `page` is zero-based; each page holds ten
    /// results.
    #[must_use]
    pub fn results_url(self, base_url: &str, keyword: &str, page: usize) -> String {
        let base = base_url.trim_end_matches('/');
        let query = keyword.split_whitespace().collect::<Vec<_>>().join("+");
        let start = page * 10;
        match self {
            SearchEngine::Google => format!("{base}/search?q={query}+filetype:pdf&start={start}"),
            SearchEngine::Scholar => format!("{base}/scholar?q={query}&start={start}"),
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchEngine::Google => "Google",
            SearchEngine::Scholar => "Google Scholar",
        })
    }
}
