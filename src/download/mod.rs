//! HTTP download engine for streaming documents to disk.
//!
//! This module provides functionality for fetching resolved document URLs
//! with streaming writes, transient-failure retry, filename derivation,
//! and the per-publisher batch worker that consumes queue files.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Automatic filename extraction from Content-Disposition headers
//! - Retry with exponential backoff for transient failures
//! - One-shot browser User-Agent fallback on 403 responses
//! - Batch worker with per-item fault isolation and queue clearing
//! - Numbered-duplicate cleanup pass over the output directory
//!
//! # Example
//!
//! ```no_run
//! use paperharvest_core::download::DownloadClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DownloadClient::new();
//! let saved = client
//!     .fetch_document("https://example.com/paper.pdf", Path::new("./pdf/reef"), None)
//!     .await?;
//! println!("Downloaded: {}", saved.path.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod filename;
mod retry;
mod worker;

pub use client::{BROWSER_USER_AGENT, DownloadClient, SavedDocument};
pub use error::DownloadError;
pub use filename::{
    fallback_filename, filename_from_url, parse_content_disposition, remove_numbered_duplicates,
    sanitize_filename,
};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    is_transient_status,
};
pub use worker::{DownloadWorker, WorkerError, WorkerReport};
