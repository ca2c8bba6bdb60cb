//! Paperharvest Core Library
//!
//! This library provides the core functionality for the paperharvest
//! tool, which turns a research keyword into a local corpus of publisher
//! documents and a CSV of structured answers extracted from each one.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`browser`] - Driver sidecar protocol and the page-session trait
//! - [`classify`] - Publisher classification of result links
//! - [`download`] - HTTP download engine with streaming support
//! - [`extract`] - Questionnaire extraction over downloaded documents
//! - [`pacing`] - Randomized politeness delays
//! - [`paths`] - Keyword-based directory and file naming
//! - [`queue`] - Per-publisher download queue persistence
//! - [`resolver`] - Per-publisher document-link resolution
//! - [`search`] - Search-engine walking and result routing
//! - [`store`] - Cumulative per-keyword result store

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;
pub mod classify;
pub mod download;
pub mod extract;
pub mod pacing;
pub mod paths;
pub mod queue;
pub mod resolver;
pub mod search;
pub mod store;

mod user_agent;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use browser::{BrowserError, BrowserSession, SidecarBrowser};
pub use classify::{Publisher, classify};
pub use download::{DownloadClient, DownloadError, DownloadWorker, RetryPolicy};
pub use extract::{DocumentAnalyst, Extractor, OpenAiClient, RetrievalAnalyst};
pub use pacing::PacingProfile;
pub use queue::{DownloadQueue, QueueError};
pub use resolver::{ResolverRegistry, build_default_registry};
pub use search::{SearchController, SearchEngine, SearchError, SearchSummary};
pub use store::{AnswerRecord, ResultStore};
