//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download a file over HTTP(S) with live progress.
///
/// The file is saved under the name the server suggests (or the last URL
/// path segment) and never overwrites an existing file. Press Ctrl-C to
/// cancel; the partial file is deleted.
#[derive(Parser, Debug)]
#[command(name = "grabfile")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the file to download (http or https)
    pub url: String,

    /// Directory to save into (default: config `output_dir`, then ~/Downloads)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seconds allowed to establish the connection (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Seconds allowed between received chunks (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Maximum redirects to follow; 0 treats any redirect as a failure (0-50)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=50))]
    pub max_redirects: Option<u8>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not draw the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Log level used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
