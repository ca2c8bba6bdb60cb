//! Filename extraction, sanitization, and duplicate cleanup for downloads.
//!
//! This module provides utilities for deriving safe filenames from URLs and
//! Content-Disposition headers, and for sweeping browser-produced numbered
//! duplicates out of an output directory.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::classify::Publisher;

use super::DownloadError;

/// Matches the `name(1).pdf` pattern a browser produces when it saves a
/// second copy of an already-present filename.
static NUMBERED_DUPLICATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\d+\)\.pdf$").unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// Sanitizes a filename for filesystem safety.
///
/// Characters that are invalid on common filesystems
/// (`\ / * ? : " < > |`) and control characters are removed outright,
/// and spaces become underscores.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Derives a filename from a URL's last path segment.
///
/// The segment is percent-decoded and sanitized, and `.pdf` is appended
/// when the segment does not already end with it. Returns `None` when the
/// URL has no usable segment.
#[must_use]
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |d| d.into_owned());
    let mut name = sanitize_filename(decoded.trim());
    if name.is_empty() {
        return None;
    }
    if !name.to_ascii_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    Some(name)
}

/// Parses a Content-Disposition header to extract the filename.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example.pdf` (RFC 5987)
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    // Try filename*= first (RFC 5987 encoded)
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim();
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = header.find("filename=") {
        let value = header[pos + 9..].trim();
        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim();
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

/// Last-resort filename when neither the response nor the URL names the
/// document: `<publisher-slug>_<unix-timestamp>.pdf`.
#[must_use]
pub fn fallback_filename(publisher: Publisher) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}_{timestamp}.pdf", publisher.slug())
}

/// Removes numbered-duplicate files (`name(1).pdf`, `name(2).PDF`, ...)
/// from `dir`, returning the removed file names.
///
/// The pattern only ever appears when a browser auto-renamed a second
/// download of the same document, so every match is a duplicate by
/// construction and is removed unconditionally.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] when the directory cannot be read;
/// individual removal failures are logged and skipped.
pub fn remove_numbered_duplicates(dir: &Path) -> Result<Vec<String>, DownloadError> {
    let entries = fs::read_dir(dir).map_err(|e| DownloadError::io(dir.to_path_buf(), e))?;

    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DownloadError::io(dir.to_path_buf(), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !NUMBERED_DUPLICATE_RE.is_match(name) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                info!(file = name, "removed numbered duplicate");
                removed.push(name.to_string());
            }
            Err(e) => {
                warn!(file = name, error = %e, "failed to remove numbered duplicate");
            }
        }
    }
    Ok(removed)
}
