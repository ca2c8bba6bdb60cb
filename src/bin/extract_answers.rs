//! Questionnaire runner for downloaded documents.
//!
//! `extract-answers --keyword <kw> [--pdf <name> | --all]` runs the
//! document analyst over one or every downloaded document of a keyword
//! and appends each answer record to the keyword's result file. With
//! neither `--pdf` nor `--all` it lists the downloaded documents and
//! exits. The API key is read from `OPENAI_API_KEY` and is needed only
//! when documents are actually analyzed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use paperharvest_core::extract::{Extractor, OpenAiClient, RetrievalAnalyst, list_documents};
use paperharvest_core::store::ResultStore;
use tracing::{debug, info};

/// Extract questionnaire answers from downloaded documents.
#[derive(Parser, Debug)]
#[command(name = "extract-answers")]
#[command(author, version, about)]
struct Args {
    /// Keyword whose downloaded documents are analyzed
    #[arg(short, long)]
    keyword: String,

    /// Analyze one document by file name
    #[arg(long, conflicts_with = "all")]
    pdf: Option<String>,

    /// Analyze every downloaded document of the keyword
    #[arg(long)]
    all: bool,

    /// Directory the per-keyword result files are written to
    #[arg(long, default_value = ".")]
    results_dir: PathBuf,

    /// Root directory documents were downloaded under
    #[arg(long, default_value = "./pdf")]
    output_root: PathBuf,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Chat model answering the questionnaire
    #[arg(long)]
    model: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let documents = match (&args.pdf, args.all) {
        (Some(name), _) => vec![name.clone()],
        (None, true) => {
            let names = list_documents(&args.output_root, &args.keyword)?;
            if names.is_empty() {
                info!(keyword = %args.keyword, "no downloaded documents to analyze");
                return Ok(());
            }
            names
        }
        (None, false) => {
            // Listing mode: document names on stdout, nothing else.
            let names = list_documents(&args.output_root, &args.keyword)?;
            if names.is_empty() {
                println!("No documents downloaded for '{}'.", args.keyword);
            } else {
                for name in names {
                    println!("{name}");
                }
            }
            return Ok(());
        }
    };

    let mut client = OpenAiClient::from_env()?;
    if let Some(api_base) = &args.api_base {
        client = client.with_api_base(api_base);
    }
    if let Some(model) = &args.model {
        client = client.with_chat_model(model);
    }

    let analyst = RetrievalAnalyst::new(client);
    let extractor = Extractor::new(Arc::new(analyst)).with_output_root(&args.output_root);
    let store = ResultStore::for_keyword(&args.results_dir, &args.keyword);

    let mut recorded = 0_usize;
    let mut missing = 0_usize;
    for document in &documents {
        info!(document = %document, "analyzing document");
        match extractor.process_document(document, &args.keyword).await {
            Some(record) => {
                store.append(&record)?;
                recorded += 1;
            }
            None => missing += 1,
        }
    }

    info!(
        recorded,
        missing,
        results = %store.path().display(),
        "Extraction complete"
    );

    Ok(())
}
