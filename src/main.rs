//! CLI entry point for the recorder scraper.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use recorder_core::{
    FileConfig, InterruptFlag, PortalClient, RunStatus, ScrapeOrchestrator,
    resolve_default_config_path,
};
use tracing::{debug, info, warn};

mod cli;
mod progress;

use cli::Args;
use progress::PageProgress;

/// Process outcome mapped to the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    /// Every page retrieved.
    Success,
    /// Output written but incomplete.
    Partial,
    /// No usable output.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Partial => ExitCode::from(1),
            ProcessExit::Failure => ExitCode::from(2),
        }
    }
}

fn determine_exit_outcome(status: RunStatus) -> ProcessExit {
    match status {
        RunStatus::Complete => ProcessExit::Success,
        RunStatus::Partial | RunStatus::Interrupted | RunStatus::SessionExpired => {
            ProcessExit::Partial
        }
        RunStatus::Running => ProcessExit::Failure,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ProcessExit::Failure.into()
        }
    }
}

/// Log level priority: RUST_LOG env var > quiet flag > verbose flag > default (info).
fn init_tracing(args: &Args) {
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

    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn load_file_config(args: &Args) -> Result<Option<FileConfig>> {
    if let Some(path) = &args.config {
        let config = FileConfig::load(path)?;
        info!(path = %path.display(), "loaded config file");
        return Ok(Some(config));
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no default config file");
        return Ok(None);
    }
    let config = FileConfig::load(&path)?;
    info!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

async fn run(args: Args) -> Result<ProcessExit> {
    let file = load_file_config(&args)?;
    let config = args.scraper_config(file.as_ref())?;
    let criteria = args.search_criteria(file.as_ref())?;

    info!(
        start = %criteria.start_date(),
        end = %criteria.end_date(),
        types = ?criteria.document_types().iter().map(ToString::to_string).collect::<Vec<_>>(),
        output = %config.run_writer().output_path().display(),
        "recorder starting"
    );

    let client = PortalClient::new(config.endpoints()?, config.request_timeout)
        .context("Failed to create HTTP client")?;

    let interrupt = InterruptFlag::new();
    interrupt.listen_for_ctrl_c();

    let show_progress = !args.no_progress && !args.quiet && io::stderr().is_terminal();
    let mut progress = PageProgress::new(show_progress);

    let mut orchestrator =
        ScrapeOrchestrator::new(&client, config.scrape_settings(), config.run_writer())
            .with_interrupt(interrupt);
    let run = orchestrator
        .run_with_observer(&criteria, &mut progress)
        .await?;

    let stats = &run.processing_stats;
    info!(
        path = %orchestrator.writer().output_path().display(),
        records = run.total_records,
        pages = %format!("{}/{}", stats.successful_pages, run.total_pages),
        seconds = stats.processing_time_seconds,
        "results saved"
    );
    match run.status {
        RunStatus::Partial => warn!(failed_pages = ?stats.failed_pages, "some pages failed"),
        RunStatus::Interrupted => warn!("interrupted by user; partial results saved"),
        RunStatus::SessionExpired => warn!("session expired; partial results saved"),
        RunStatus::Complete | RunStatus::Running => {}
    }

    Ok(determine_exit_outcome(run.status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_outcome_success_when_complete() {
        assert_eq!(
            determine_exit_outcome(RunStatus::Complete),
            ProcessExit::Success
        );
    }

    #[test]
    fn test_exit_outcome_partial_when_output_incomplete() {
        assert_eq!(
            determine_exit_outcome(RunStatus::Partial),
            ProcessExit::Partial
        );
        assert_eq!(
            determine_exit_outcome(RunStatus::Interrupted),
            ProcessExit::Partial
        );
        assert_eq!(
            determine_exit_outcome(RunStatus::SessionExpired),
            ProcessExit::Partial
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::from(ProcessExit::Success), ExitCode::SUCCESS);
        assert_eq!(ExitCode::from(ProcessExit::Failure), ExitCode::from(2));
    }
}
