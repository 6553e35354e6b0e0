//! url-harvest main entry point
//!
//! This is the command-line interface for the url-harvest downloader.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url_harvest::config::{load_config, Config};
use url_harvest::{build_pipeline, HarvestError};

/// url-harvest: download every URL listed in a file
///
/// Reads URLs (one per line, after a header line), fetches them with
/// bounded concurrency and stores each body as
/// `<urlsafe-base64(url)>.txt` in the output directory.
#[derive(Parser, Debug)]
#[command(name = "url-harvest")]
#[command(version)]
#[command(about = "Download content from URLs listed in a file", long_about = None)]
struct Cli {
    /// Path to the file containing URLs (first line is a header)
    #[arg(short, long, value_name = "PATH")]
    csv: PathBuf,

    /// Directory downloaded bodies are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Execution failed: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("url_harvest=info,warn"),
            1 => EnvFilter::new("url_harvest=debug,info"),
            2 => EnvFilter::new("url_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the pipeline and runs it until completion or a shutdown signal
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
    }

    // The source stage would only log this; a bad input path must fail the process
    tokio::fs::File::open(&cli.csv)
        .await
        .with_context(|| format!("cannot open input file {}", cli.csv.display()))?;

    let pipeline = build_pipeline(&config, &cli.csv).context("failed to build pipeline")?;

    tracing::info!(
        csv_path = %cli.csv.display(),
        output_dir = %config.output.directory,
        max_in_flight = config.pipeline.max_in_flight,
        "Starting URL processing"
    );

    // The source stage generates its own data, so its input is closed from the start
    let (_, input) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let result = tokio::select! {
        result = pipeline.run(cancel.clone(), input) => result,
        _ = wait_for_signal() => {
            cancel.cancel();
            Err(HarvestError::Cancelled)
        }
    };

    if cancel.is_cancelled() {
        let grace = Duration::from_secs(config.pipeline.shutdown_grace_secs);
        if pipeline.wait_for_stages(grace).await {
            tracing::info!("Shutdown completed");
        } else {
            tracing::warn!(grace_secs = grace.as_secs(), "Stages still running after grace period, exiting");
        }
    }

    result?;
    tracing::info!("Processing completed");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C signal");
            } else {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
