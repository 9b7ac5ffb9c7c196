//! CLI entry point for grabfile.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod app;
mod cli;

use app::terminal;
use cli::Args;

/// Process exit outcome, mapped to the exit code on return from `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
    Cancelled,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Cancelled => ExitCode::from(130),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::no_color_env_requested() || terminal::is_dumb_terminal();
    terminal::init_tracing(args.default_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    match app::runtime::run_grabfile(args).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}
