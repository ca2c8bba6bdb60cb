//! Keyword-based directory and file naming.
//!
//! Downloads for one research keyword land in a dedicated subdirectory of
//! the output root, and that keyword's extraction results accumulate in a
//! matching CSV file. The slug is the single naming rule shared by both.

use std::path::{Path, PathBuf};

/// Filesystem-safe form of a keyword: trimmed, spaces replaced with
/// underscores.
#[must_use]
pub fn keyword_slug(keyword: &str) -> String {
    keyword.trim().replace(' ', "_")
}

/// Directory holding downloaded documents for a keyword.
#[must_use]
pub fn keyword_dir(output_root: &Path, keyword: &str) -> PathBuf {
    output_root.join(keyword_slug(keyword))
}

/// File name of the cumulative result store for a keyword.
#[must_use]
pub fn results_file_name(keyword: &str) -> String {
    format!("{}.csv", keyword_slug(keyword))
}
