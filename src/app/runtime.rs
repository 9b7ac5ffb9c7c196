use std::fs;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use grabfile_core::{
    DownloadEngine, DownloadError, DownloadOutcome, DownloadRequest, DownloadSlot, FailureKind,
    HttpClient,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config, exit_handler, progress_display::ProgressDisplay, terminal};
use crate::cli::Args;

pub(crate) async fn run_grabfile(args: Args) -> Result<ProcessExit> {
    let file_config = config::load_default_file_config()?;
    let settings = config::resolve_settings(&args, file_config.as_ref());
    debug!(?settings, "settings resolved");

    if !settings.output_dir.exists() {
        fs::create_dir_all(&settings.output_dir).with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;
        info!(dir = %settings.output_dir.display(), "Created output directory");
    }

    let client =
        HttpClient::with_config(settings.http).context("Failed to build HTTP client")?;
    let engine = DownloadEngine::new(client, settings.output_dir);

    let display = ProgressDisplay::new(terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        args.no_progress,
        terminal::is_dumb_terminal(),
    ));

    let slot = DownloadSlot::new();
    let handle = slot.try_launch(engine, DownloadRequest::new(&args.url), display.sink())?;

    let ctrl_c_slot = slot.clone();
    let ctrl_c_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, cancelling download");
            ctrl_c_slot.cancel_active();
        }
    });

    let outcome = handle.wait().await;
    ctrl_c_task.abort();
    display.finish(&outcome);

    report_outcome(&outcome, args.quiet);
    Ok(exit_handler::determine_exit_outcome(&outcome))
}

fn report_outcome(outcome: &DownloadOutcome, quiet: bool) {
    match outcome {
        DownloadOutcome::Completed(done) => {
            if !quiet {
                println!("Download complete: {}", done.path.display());
            }
        }
        DownloadOutcome::Cancelled => eprintln!("Download cancelled"),
        DownloadOutcome::Failed(error) => eprintln!("{}", failure_message(error)),
    }
}

/// One line per failure kind, with the error's own context appended.
fn failure_message(error: &DownloadError) -> String {
    let reason = match error.kind() {
        FailureKind::Connection => "could not reach the server",
        FailureKind::HttpStatus => "server refused the request",
        FailureKind::Io => "transfer or write failed",
        FailureKind::Task => "download task stopped unexpectedly",
    };
    format!("Download interrupted: {reason} ({error})")
}
