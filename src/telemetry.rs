//! Tracing initialization.

use crate::cli::Cli;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `--log-level`. With `--log-file`, events are
/// appended to that file. Otherwise they go to stderr, except for the interactive
/// dashboard, where stderr output would tear the screen and logging stays off.
pub(crate) fn init_tracing(args: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("invalid log filter {:?}", args.log_level))?;

    let res = match args.log_file.as_deref() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None if args.is_interactive() => return Ok(()),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    res.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}
