//! Keyword search: engine drive, result routing, queue population.
//!
//! # Architecture
//!
//! - [`SearchEngine`] - Results-page URLs, page caps, result selectors
//! - [`SearchController`] - Walks result pages and routes every link
//! - [`SearchSummary`] - Outcome counts from one run
//! - [`SearchError`] - The run-aborting failure (bot challenge)

mod controller;
mod engine;

pub use controller::{SearchController, SearchError, SearchSummary};
pub use engine::SearchEngine;
