//! Per-publisher queue download worker.
//!
//! Drains one publisher's queue file and fetches every document in it:
//! `publisher-worker <output_directory> <queue_file>`. The publisher is
//! normally inferred from the queue file name; `--publisher` overrides.
//! Publishers that resolve documents on live article pages additionally
//! need `--driver-cmd` to start a browser session.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paperharvest_core::browser::SidecarBrowser;
use paperharvest_core::classify::Publisher;
use paperharvest_core::download::DownloadWorker;
use paperharvest_core::pacing::PacingProfile;
use paperharvest_core::queue::{drain_file, infer_publisher};
use paperharvest_core::resolver::{ResolveStage, build_default_registry};
use tracing::{debug, error, info};

/// Download every queued document for one publisher.
#[derive(Parser, Debug)]
#[command(name = "publisher-worker")]
#[command(author, version, about)]
struct Args {
    /// Directory downloaded documents are written to
    output_directory: PathBuf,

    /// Queue file holding the publisher's pending URLs
    queue_file: PathBuf,

    /// Publisher slug; inferred from the queue file name when omitted
    #[arg(long, value_parser = parse_publisher)]
    publisher: Option<Publisher>,

    /// Command line that starts the browser automation driver
    #[arg(long)]
    driver_cmd: Option<String>,

    /// Skip politeness delays (development and test runs only)
    #[arg(long)]
    fast: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

/// Maps a `--publisher` slug to its enum value, naming the known slugs on
/// failure so the usage error is actionable.
fn parse_publisher(slug: &str) -> Result<Publisher, String> {
    Publisher::from_slug(slug).ok_or_else(|| {
        let known = Publisher::QUEUEABLE
            .iter()
            .map(|publisher| publisher.slug())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown publisher '{slug}' (known: {known})")
    })
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

    let Some(publisher) = args.publisher.or_else(|| infer_publisher(&args.queue_file)) else {
        bail!(
            "cannot infer the publisher from {}; pass --publisher <slug>",
            args.queue_file.display()
        );
    };

    // An absent queue means no work was produced for this publisher, which
    // is a normal end state for a search run, not a failure.
    if !args.queue_file.is_file() {
        error!(
            path = %args.queue_file.display(),
            "queue file not found; nothing to download"
        );
        return Ok(());
    }

    let pending = drain_file(&args.queue_file)?.len();
    info!(publisher = %publisher, pending, "starting publisher worker");

    let mut worker = DownloadWorker::new(publisher, &args.queue_file, &args.output_directory);
    if args.fast {
        worker = worker.with_pacing(PacingProfile::zero());
    }

    let needs_browser =
        build_default_registry().stage_of(publisher) == Some(ResolveStage::Download);
    if needs_browser && let Some(driver_cmd) = args.driver_cmd.as_deref() {
        // Session initialization failure is fatal to the whole run.
        let browser = SidecarBrowser::launch(driver_cmd).await?;
        worker = worker.with_browser(Arc::new(browser));
    }

    let spinner = batch_spinner(publisher, pending, args.quiet);
    let outcome = worker.run().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = outcome?;

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed(),
        "Worker finished"
    );

    Ok(())
}

/// Progress spinner for the batch, shown only on interactive terminals.
fn batch_spinner(publisher: Publisher, pending: usize, quiet: bool) -> Option<ProgressBar> {
    if quiet || !io::stderr().is_terminal() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!(
        "Downloading {pending} queued documents from {publisher}..."
    ));
    Some(spinner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_positionals_parse() {
        let args =
            Args::try_parse_from(["publisher-worker", "./pdf/north_sea", "springer_urls.csv"])
                .unwrap();
        assert_eq!(args.output_directory, PathBuf::from("./pdf/north_sea"));
        assert_eq!(args.queue_file, PathBuf::from("springer_urls.csv"));
        assert_eq!(args.publisher, None);
        assert_eq!(args.driver_cmd, None);
        assert!(!args.fast);
    }

    #[test]
    fn test_cli_missing_positional_is_rejected() {
        let result = Args::try_parse_from(["publisher-worker", "./pdf/north_sea"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_extra_positional_is_rejected() {
        let result = Args::try_parse_from([
            "publisher-worker",
            "./pdf/north_sea",
            "springer_urls.csv",
            "stray",
        ]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_publisher_slug_parses_to_enum() {
        let args = Args::try_parse_from([
            "publisher-worker",
            "./pdf/north_sea",
            "queued.csv",
            "--publisher",
            "sciencedirect",
        ])
        .unwrap();
        assert_eq!(args.publisher, Some(Publisher::ScienceDirect));
    }

    #[test]
    fn test_cli_unknown_publisher_slug_is_rejected() {
        let result = Args::try_parse_from([
            "publisher-worker",
            "./pdf/north_sea",
            "queued.csv",
            "--publisher",
            "elsevier",
        ]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_parse_publisher_error_names_known_slugs() {
        let message = parse_publisher("nope").unwrap_err();
        assert!(message.contains("springer"));
        assert!(message.contains("sciencedirect"));
    }
}
