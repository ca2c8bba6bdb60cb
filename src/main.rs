//! CLI entry point for the keyword search flow.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use paperharvest_core::browser::SidecarBrowser;
use paperharvest_core::pacing::PacingProfile;
use paperharvest_core::paths::keyword_dir;
use paperharvest_core::queue::DownloadQueue;
use paperharvest_core::search::{SearchController, SearchEngine};
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
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
    info!(keyword = %args.keyword, "Paperharvest starting");

    // Session initialization failure is fatal to the whole run.
    let browser = Arc::new(SidecarBrowser::launch(&args.driver_cmd).await?);

    let pacing = if args.fast {
        PacingProfile::zero()
    } else {
        PacingProfile::standard()
    };

    let queue = DownloadQueue::new(&args.queue_dir);
    let mut controller = SearchController::new(SearchEngine::from(args.engine), browser)
        .with_output_root(&args.output_root)
        .with_queue(queue.clone())
        .with_pacing(pacing);
    if let Some(max_pages) = args.max_pages {
        controller = controller.with_max_pages(max_pages);
    }

    let summary = controller.run(&args.keyword).await?;

    info!(
        pages = summary.pages,
        results = summary.results,
        downloaded = summary.downloaded,
        queued = summary.queued,
        "Search complete"
    );

    if args.run_workers {
        run_pending_workers(&args, &queue).await?;
    }

    Ok(())
}

/// Spawns one `publisher-worker` process per non-empty queue, sequentially.
/// A worker that fails to start or exits non-zero is logged and the
/// remaining workers still run.
async fn run_pending_workers(args: &Args, queue: &DownloadQueue) -> Result<()> {
    let pending = queue.publishers_with_pending()?;
    if pending.is_empty() {
        info!("No queued publisher downloads");
        return Ok(());
    }

    let worker_bin = std::env::current_exe()?.with_file_name("publisher-worker");
    let output_dir = keyword_dir(&args.output_root, &args.keyword);

    for publisher in pending {
        info!(publisher = %publisher, "starting download worker");
        let mut command = tokio::process::Command::new(&worker_bin);
        command
            .arg(&output_dir)
            .arg(queue.path_for(publisher))
            .arg("--publisher")
            .arg(publisher.slug())
            .arg("--driver-cmd")
            .arg(&args.driver_cmd);
        if args.fast {
            command.arg("--fast");
        }
        if args.quiet {
            command.arg("--quiet");
        }
        for _ in 0..args.verbose {
            command.arg("-v");
        }

        match command.status().await {
            Ok(status) if status.success() => {
                debug!(publisher = %publisher, "worker finished");
            }
            Ok(status) => {
                error!(publisher = %publisher, code = ?status.code(), "worker exited with failure");
            }
            Err(e) => {
                error!(publisher = %publisher, error = %e, "worker failed to start");
            }
        }
    }

    Ok(())
}
