//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use paperharvest_core::search::SearchEngine;

/// Search for scholarly documents and queue publisher downloads.
///
/// Paperharvest walks a search engine's results for a keyword, downloads
/// the documents it can fetch directly, and queues publisher article
/// links for the per-publisher download workers.
#[derive(Parser, Debug)]
#[command(name = "paperharvest")]
#[command(author, version, about)]
pub struct Args {
    /// Keyword to search for
    #[arg(short, long)]
    pub keyword: String,

    /// Search engine whose results are walked
    #[arg(short, long, value_enum)]
    pub engine: EngineChoice,

    /// Root directory downloaded documents are saved under
    #[arg(long, default_value = "./pdf")]
    pub output_root: PathBuf,

    /// Directory holding the per-publisher queue files
    #[arg(long, default_value = ".")]
    pub queue_dir: PathBuf,

    /// Override the engine's result-page cap
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Command line that starts the browser automation driver
    #[arg(long)]
    pub driver_cmd: String,

    /// Run the per-publisher download workers after the search
    #[arg(long)]
    pub run_workers: bool,

    /// Skip politeness delays (development and test runs only)
    #[arg(long)]
    pub fast: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Search engine selection on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineChoice {
    /// Plain Google web search with a filetype:pdf filter
    Google,
    /// Google Scholar
    Scholar,
}

impl From<EngineChoice> for SearchEngine {
    fn from(choice: EngineChoice) -> Self {
        match choice {
            EngineChoice::Google => SearchEngine::Google,
            EngineChoice::Scholar => SearchEngine::Scholar,
        }
    }
}
